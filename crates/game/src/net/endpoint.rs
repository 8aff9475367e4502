use std::io;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use log::{debug, trace};

use super::protocol::{MAX_PACKET_SIZE, Packet};
use super::simulator::LinkSimulator;
use super::stats::{NetworkStats, PacketLossSimulation};
use super::transport::{NetError, Transport};
use crate::simulation::Clock;

/// Non-blocking UDP socket with broadcast enabled.
pub struct UdpEndpoint<C: Clock> {
    socket: UdpSocket,
    local_addr: SocketAddr,
    remote_addr: Option<SocketAddr>,
    clock: C,
    stats: NetworkStats,
    recv_buffer: [u8; MAX_PACKET_SIZE],
    last_receive_at: Option<u64>,
    link: Option<LinkSimulator>,
}

impl<C: Clock> UdpEndpoint<C> {
    pub fn bind<A: ToSocketAddrs>(addr: A, clock: C) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        socket.set_broadcast(true)?;

        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            remote_addr: None,
            clock,
            stats: NetworkStats::default(),
            recv_buffer: [0u8; MAX_PACKET_SIZE],
            last_receive_at: None,
            link: None,
        })
    }

    /// Binds an ephemeral port on all interfaces.
    pub fn bind_any(clock: C) -> io::Result<Self> {
        Self::bind((Ipv4Addr::UNSPECIFIED, 0), clock)
    }

    pub fn with_simulation(mut self, simulation: PacketLossSimulation) -> Self {
        self.link = simulation
            .enabled
            .then(|| LinkSimulator::new(simulation));
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut NetworkStats {
        &mut self.stats
    }

    fn receive_raw(&mut self) -> Result<Vec<(SocketAddr, Packet)>, NetError> {
        let mut packets = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.recv_buffer) {
                Ok((size, addr)) => match Packet::deserialize(&self.recv_buffer[..size]) {
                    Ok(packet) if packet.header.is_valid() => {
                        self.stats.packets_received += 1;
                        self.stats.bytes_received += size as u64;
                        packets.push((addr, packet));
                    }
                    Ok(_) | Err(_) => {
                        trace!("Dropping malformed datagram ({size} bytes) from {addr}");
                        self.stats.malformed_received += 1;
                    }
                },
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                // ICMP port unreachable from an earlier send surfaces here on some platforms.
                Err(ref e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(e) if packets.is_empty() => return Err(e.into()),
                Err(e) => {
                    debug!("Receive stopped after {} packets: {e}", packets.len());
                    break;
                }
            }
        }

        Ok(packets)
    }
}

impl<C: Clock> Transport for UdpEndpoint<C> {
    fn connect(&mut self, addr: SocketAddr) -> Result<(), NetError> {
        debug!("Endpoint {} targeting {addr}", self.local_addr);
        self.remote_addr = Some(addr);
        self.last_receive_at = None;
        if let Some(link) = &mut self.link {
            link.clear();
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.remote_addr = None;
        self.last_receive_at = None;
    }

    fn is_connected(&self) -> bool {
        self.remote_addr.is_some()
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    fn send(&mut self, packet: &Packet) -> Result<usize, NetError> {
        let addr = self.remote_addr.ok_or(NetError::NotConnected)?;
        self.send_to(addr, packet)
    }

    fn send_to(&mut self, addr: SocketAddr, packet: &Packet) -> Result<usize, NetError> {
        let data = packet.serialize()?;

        if data.len() > MAX_PACKET_SIZE {
            return Err(NetError::Oversize(data.len()));
        }

        let bytes = self.socket.send_to(&data, addr)?;

        self.stats.packets_sent += 1;
        self.stats.bytes_sent += bytes as u64;

        Ok(bytes)
    }

    fn broadcast(&mut self, port: u16, packet: &Packet) -> Result<usize, NetError> {
        self.send_to(SocketAddr::from((Ipv4Addr::BROADCAST, port)), packet)
    }

    fn poll_incoming(&mut self) -> Result<Vec<(SocketAddr, Packet)>, NetError> {
        let now = self.clock.now_ms();
        let received = self.receive_raw()?;

        let packets = match &mut self.link {
            Some(link) => {
                for (addr, packet) in received {
                    if !link.enqueue(packet, addr, now) {
                        self.stats.packets_dropped += 1;
                    }
                }
                link.take_ready(now)
            }
            None => received,
        };

        if self
            .remote_addr
            .is_some_and(|remote| packets.iter().any(|(addr, _)| *addr == remote))
        {
            self.last_receive_at = Some(now);
        }

        Ok(packets)
    }

    fn last_packet_received_at(&self) -> Option<u64> {
        self.last_receive_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::{PacketHeader, PacketType};
    use crate::simulation::ManualClock;

    fn endpoint(clock: &ManualClock) -> UdpEndpoint<ManualClock> {
        UdpEndpoint::bind("127.0.0.1:0", clock.clone()).unwrap()
    }

    fn wait_for_packets(endpoint: &mut UdpEndpoint<ManualClock>) -> Vec<(SocketAddr, Packet)> {
        for _ in 0..200 {
            let packets = endpoint.poll_incoming().unwrap();
            if !packets.is_empty() {
                return packets;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        Vec::new()
    }

    #[test]
    fn test_send_without_remote_fails() {
        let clock = ManualClock::new(0);
        let mut client = endpoint(&clock);
        let packet = Packet::new(
            PacketHeader::new(1),
            PacketType::UpgradeAvailable {
                version: "2".into(),
            },
        );

        assert!(matches!(client.send(&packet), Err(NetError::NotConnected)));
    }

    #[test]
    fn test_receive_stamps_connected_host() {
        let clock = ManualClock::new(500);
        let mut host = endpoint(&clock);
        let mut client = endpoint(&clock);
        client.connect(host.local_addr()).unwrap();

        let packet = Packet::new(
            PacketHeader::new(3),
            PacketType::UpgradeAvailable {
                version: "2".into(),
            },
        );
        host.send_to(client.local_addr(), &packet).unwrap();

        let received = wait_for_packets(&mut client);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].1, packet);
        assert_eq!(client.last_packet_received_at(), Some(500));
        assert_eq!(client.stats().packets_received, 1);
    }

    #[test]
    fn test_disconnect_clears_remote() {
        let clock = ManualClock::new(0);
        let mut client = endpoint(&clock);
        client.connect("127.0.0.1:9".parse().unwrap()).unwrap();
        assert!(client.is_connected());

        client.disconnect();
        client.disconnect();
        assert!(!client.is_connected());
        assert_eq!(client.remote_addr(), None);
    }
}
