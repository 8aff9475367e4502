use std::collections::VecDeque;

use super::protocol::PacketKind;

#[derive(Debug, Clone)]
pub struct PendingPacket {
    pub kind: PacketKind,
    pub packet_id: u32,
    pub sent_at: u64,
}

/// Durable packets this client sent, awaiting an ACK from the host. ACKs
/// feed a smoothed round-trip estimate.
#[derive(Debug)]
pub struct AckTracker {
    pending: VecDeque<PendingPacket>,
    max_pending: usize,
    srtt: f32,
    rtt_var: f32,
}

impl AckTracker {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(max_pending),
            max_pending,
            srtt: 100.0,
            rtt_var: 50.0,
        }
    }

    pub fn track_packet(&mut self, kind: PacketKind, packet_id: u32, sent_at: u64) {
        while self.pending.len() >= self.max_pending {
            self.pending.pop_front();
        }

        self.pending.push_back(PendingPacket {
            kind,
            packet_id,
            sent_at,
        });
    }

    /// Matches an ACK against the pending list. Returns the measured round
    /// trip in milliseconds, or `None` for an unknown or repeated ACK.
    pub fn process_ack(&mut self, kind: PacketKind, packet_id: u32, now_ms: u64) -> Option<u64> {
        let position = self
            .pending
            .iter()
            .position(|p| p.kind == kind && p.packet_id == packet_id)?;
        let pending = self.pending.remove(position)?;

        let rtt = now_ms.saturating_sub(pending.sent_at);
        self.update_rtt(rtt as f32);
        Some(rtt)
    }

    fn update_rtt(&mut self, rtt: f32) {
        const ALPHA: f32 = 0.125;
        const BETA: f32 = 0.25;

        let diff = (rtt - self.srtt).abs();
        self.rtt_var = (1.0 - BETA) * self.rtt_var + BETA * diff;
        self.srtt = (1.0 - ALPHA) * self.srtt + ALPHA * rtt;
    }

    pub fn srtt(&self) -> f32 {
        self.srtt
    }

    pub fn rtt_var(&self) -> f32 {
        self.rtt_var
    }

    pub fn unacked_count(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Remembers recently applied durable packets so a retransmission is
/// acknowledged again without being applied twice.
#[derive(Debug)]
pub struct DuplicateFilter {
    recent: VecDeque<(PacketKind, u32)>,
    max_recent: usize,
}

impl Default for DuplicateFilter {
    fn default() -> Self {
        Self::new(256)
    }
}

impl DuplicateFilter {
    pub fn new(max_recent: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(max_recent),
            max_recent,
        }
    }

    /// Records the packet. Returns `false` if it was already seen.
    pub fn record_received(&mut self, kind: PacketKind, packet_id: u32) -> bool {
        if self.recent.contains(&(kind, packet_id)) {
            return false;
        }

        if self.recent.len() >= self.max_recent {
            self.recent.pop_front();
        }
        self.recent.push_back((kind, packet_id));

        true
    }

    pub fn clear(&mut self) {
        self.recent.clear();
    }
}
