use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::net::SocketAddr;

use super::protocol::Packet;
use super::stats::PacketLossSimulation;

#[derive(Debug)]
struct DelayedPacket {
    release_at: u64,
    packet: Packet,
    addr: SocketAddr,
}

impl PartialEq for DelayedPacket {
    fn eq(&self, other: &Self) -> bool {
        self.release_at == other.release_at
    }
}

impl Eq for DelayedPacket {}

impl PartialOrd for DelayedPacket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedPacket {
    fn cmp(&self, other: &Self) -> Ordering {
        // min-heap on release time
        other.release_at.cmp(&self.release_at)
    }
}

/// Inbound impairment queue: drops and delays datagrams according to a
/// `PacketLossSimulation` before the client sees them.
#[derive(Debug, Default)]
pub struct LinkSimulator {
    config: PacketLossSimulation,
    inbound: BinaryHeap<DelayedPacket>,
}

impl LinkSimulator {
    pub fn new(config: PacketLossSimulation) -> Self {
        Self {
            config,
            inbound: BinaryHeap::new(),
        }
    }

    pub fn config(&self) -> &PacketLossSimulation {
        &self.config
    }

    /// Queues `packet` unless the simulated link loses it. Returns whether
    /// it was kept.
    pub fn enqueue(&mut self, packet: Packet, addr: SocketAddr, now_ms: u64) -> bool {
        if self.config.should_drop() {
            return false;
        }
        self.inbound.push(DelayedPacket {
            release_at: now_ms.saturating_add(self.config.delay_ms()),
            packet,
            addr,
        });
        true
    }

    pub fn take_ready(&mut self, now_ms: u64) -> Vec<(SocketAddr, Packet)> {
        let mut packets = Vec::new();
        while self
            .inbound
            .peek()
            .is_some_and(|delayed| delayed.release_at <= now_ms)
        {
            if let Some(delayed) = self.inbound.pop() {
                packets.push((delayed.addr, delayed.packet));
            }
        }
        packets
    }

    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    pub fn clear(&mut self) {
        self.inbound.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::{PacketHeader, PacketType};

    fn packet(id: u32) -> Packet {
        Packet::new(
            PacketHeader::new(id),
            PacketType::UpgradeAvailable {
                version: "1".into(),
            },
        )
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }

    #[test]
    fn test_delayed_release_in_order() {
        let mut sim = LinkSimulator::new(PacketLossSimulation {
            enabled: true,
            min_latency_ms: 30,
            max_latency_ms: 30,
            ..Default::default()
        });

        assert!(sim.enqueue(packet(1), addr(), 100));
        assert!(sim.enqueue(packet(2), addr(), 110));

        assert!(sim.take_ready(129).is_empty());
        let ready = sim.take_ready(130);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].1.id(), 1);
        assert_eq!(sim.take_ready(140)[0].1.id(), 2);
        assert_eq!(sim.pending(), 0);
    }

    #[test]
    fn test_lossy_link_drops() {
        let mut sim = LinkSimulator::new(PacketLossSimulation::lossy(100.0));
        assert!(!sim.enqueue(packet(1), addr(), 0));
        assert!(sim.take_ready(u64::MAX).is_empty());
    }
}
