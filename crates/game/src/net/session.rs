//! Connection lifecycle and acknowledgment discipline over a raw datagram
//! link.
//!
//! The host retransmits durable packets until it sees an ACK naming the
//! packet kind and id. Until WELCOME arrives the client has no roster, so
//! durable packets are dropped unacknowledged and the host tries again
//! later. Once established, every durable packet is acknowledged, including
//! retransmissions of packets that were already applied.

use std::net::SocketAddr;

use log::{debug, info, warn};

use super::protocol::{PROTOCOL_VERSION, Packet, PacketHeader, PacketKind, PacketType};
use super::tracking::{AckTracker, DuplicateFilter};
use super::transport::{NetError, Transport};
use crate::player::{PlayerId, Team};

pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_NETWORK_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    JoinSent {
        sent_at: u64,
    },
    Established {
        since: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisconnectReason {
    #[error("server did not answer the join request")]
    JoinTimedOut,
    #[error("join denied: {0}")]
    JoinDenied(String),
    #[error("protocol mismatch: server speaks version {server}, client speaks {client}")]
    ProtocolMismatch { server: u32, client: u32 },
    #[error("connection timed out")]
    TimedOut,
    #[error("removed from server{}", kick_suffix(.0))]
    Kicked(Option<String>),
    #[error("disconnected")]
    Requested,
}

fn kick_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

/// What to do with an inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Apply; no acknowledgment owed.
    Process,
    /// Apply, then acknowledge.
    ProcessAndAck,
    /// Already applied: acknowledge again, do not apply.
    Duplicate,
    /// Arrived before WELCOME: drop without acknowledgment.
    Defer,
}

impl Admission {
    pub fn should_apply(self) -> bool {
        matches!(self, Self::Process | Self::ProcessAndAck)
    }

    pub fn should_ack(self) -> bool {
        matches!(self, Self::ProcessAndAck | Self::Duplicate)
    }
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    next_packet_id: u32,
    join_timeout_ms: u64,
    network_timeout_ms: u64,
    acks: AckTracker,
    duplicates: DuplicateFilter,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_JOIN_TIMEOUT_MS, DEFAULT_NETWORK_TIMEOUT_MS)
    }
}

impl Session {
    pub fn new(join_timeout_ms: u64, network_timeout_ms: u64) -> Self {
        Self {
            state: SessionState::Disconnected,
            next_packet_id: 1,
            join_timeout_ms,
            network_timeout_ms,
            acks: AckTracker::new(256),
            duplicates: DuplicateFilter::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state != SessionState::Disconnected
    }

    pub fn is_established(&self) -> bool {
        matches!(self.state, SessionState::Established { .. })
    }

    pub fn is_joining(&self) -> bool {
        matches!(self.state, SessionState::JoinSent { .. })
    }

    pub fn srtt(&self) -> f32 {
        self.acks.srtt()
    }

    pub fn unacked_count(&self) -> usize {
        self.acks.unacked_count()
    }

    /// Wraps `payload` in a packet with the next outbound id.
    pub fn create_packet(&mut self, payload: PacketType) -> Packet {
        let packet_id = self.next_packet_id;
        self.next_packet_id = self.next_packet_id.wrapping_add(1).max(1);
        Packet::new(PacketHeader::new(packet_id), payload)
    }

    /// Points `transport` at `addr` and sends JOIN.
    pub fn connect<T: Transport>(
        &mut self,
        transport: &mut T,
        addr: SocketAddr,
        name: &str,
        team: Option<Team>,
        now_ms: u64,
    ) -> Result<(), NetError> {
        self.reset();
        transport.connect(addr)?;

        let join = PacketType::Join {
            protocol_version: PROTOCOL_VERSION,
            name: name.to_owned(),
            team,
        };
        self.send(transport, join, now_ms)?;
        self.state = SessionState::JoinSent { sent_at: now_ms };

        info!("Joining {addr} as {name:?}");
        Ok(())
    }

    /// Checks a WELCOME against the local protocol version and moves to
    /// ESTABLISHED on success.
    pub fn accept_welcome(
        &mut self,
        protocol_version: u32,
        now_ms: u64,
    ) -> Result<(), DisconnectReason> {
        if protocol_version != PROTOCOL_VERSION {
            return Err(DisconnectReason::ProtocolMismatch {
                server: protocol_version,
                client: PROTOCOL_VERSION,
            });
        }
        self.state = SessionState::Established { since: now_ms };
        Ok(())
    }

    /// Sends to the connected host. Durable packets are tracked for ACK
    /// round-trip measurement. Returns the packet id.
    pub fn send<T: Transport>(
        &mut self,
        transport: &mut T,
        payload: PacketType,
        now_ms: u64,
    ) -> Result<u32, NetError> {
        let packet = self.create_packet(payload);
        transport.send(&packet)?;

        if packet.kind().is_durable() {
            self.acks.track_packet(packet.kind(), packet.id(), now_ms);
        }
        Ok(packet.id())
    }

    pub fn check_timeouts(
        &self,
        now_ms: u64,
        last_received_at: Option<u64>,
    ) -> Option<DisconnectReason> {
        match self.state {
            SessionState::Disconnected => None,
            SessionState::JoinSent { sent_at } => {
                (now_ms.saturating_sub(sent_at) > self.join_timeout_ms).then(|| {
                    warn!("Join request timed out");
                    DisconnectReason::JoinTimedOut
                })
            }
            SessionState::Established { since } => {
                let last = last_received_at.map_or(since, |at| at.max(since));
                (now_ms.saturating_sub(last) > self.network_timeout_ms).then(|| {
                    warn!("No packets from host for {} ms", now_ms.saturating_sub(last));
                    DisconnectReason::TimedOut
                })
            }
        }
    }

    /// Decides how an inbound packet is handled. `local_id` is `None` while
    /// the roster is empty.
    pub fn admit(&mut self, packet: &Packet, local_id: Option<PlayerId>) -> Admission {
        let durable = packet.kind().is_durable() || packet.payload.requires_ack(local_id);
        if !durable {
            return Admission::Process;
        }

        if local_id.is_none() {
            debug!(
                "Deferring {:?} #{} until welcomed",
                packet.kind(),
                packet.id()
            );
            return Admission::Defer;
        }

        if self.duplicates.record_received(packet.kind(), packet.id()) {
            Admission::ProcessAndAck
        } else {
            debug!("Re-acknowledging duplicate {:?} #{}", packet.kind(), packet.id());
            Admission::Duplicate
        }
    }

    /// Sends ACK for `packet` on behalf of `local_id`.
    pub fn acknowledge<T: Transport>(
        &mut self,
        transport: &mut T,
        local_id: PlayerId,
        packet: &Packet,
        now_ms: u64,
    ) -> Result<u32, NetError> {
        let ack = PacketType::Ack {
            player_id: local_id,
            kind: packet.kind(),
            packet_id: packet.id(),
        };
        self.send(transport, ack, now_ms)
    }

    /// Matches a host ACK against our own durable packets. Returns the
    /// measured round trip.
    pub fn handle_ack(&mut self, kind: PacketKind, packet_id: u32, now_ms: u64) -> Option<u64> {
        self.acks.process_ack(kind, packet_id, now_ms)
    }

    /// Returns to DISCONNECTED, forgetting every pending and remembered
    /// packet. Packet ids keep increasing across sessions.
    pub fn reset(&mut self) {
        self.state = SessionState::Disconnected;
        self.acks.clear();
        self.duplicates.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::Recipient;

    fn packet(id: u32, payload: PacketType) -> Packet {
        Packet::new(PacketHeader::new(id), payload)
    }

    fn announce(id: u32) -> Packet {
        packet(
            id,
            PacketType::Announce {
                player_id: 7,
                name: "bob".into(),
                team: Team::Red,
            },
        )
    }

    #[test]
    fn test_packet_ids_increase() {
        let mut session = Session::default();
        let first = session.create_packet(PacketType::UpgradeAvailable {
            version: String::new(),
        });
        let second = session.create_packet(PacketType::UpgradeAvailable {
            version: String::new(),
        });

        assert_eq!(second.id(), first.id() + 1);
    }

    #[test]
    fn test_durable_deferred_before_welcome() {
        let mut session = Session::default();

        assert_eq!(session.admit(&announce(1), None), Admission::Defer);
        assert_eq!(session.admit(&announce(1), Some(3)), Admission::ProcessAndAck);
    }

    #[test]
    fn test_duplicates_acked_not_applied() {
        let mut session = Session::default();

        let first = session.admit(&announce(4), Some(3));
        let again = session.admit(&announce(4), Some(3));

        assert!(first.should_apply() && first.should_ack());
        assert_eq!(again, Admission::Duplicate);
        assert!(!again.should_apply() && again.should_ack());
    }

    #[test]
    fn test_unaddressed_update_needs_no_ack() {
        let mut session = Session::default();
        let update = |player_id| {
            packet(
                9,
                PacketType::PlayerUpdate {
                    player_id,
                    position: [0.0; 2],
                    velocity: [0.0; 2],
                    rotation: 0.0,
                    rotational_velocity: 0.0,
                    flags: 0,
                },
            )
        };

        assert_eq!(session.admit(&update(8), Some(3)), Admission::Process);
        assert_eq!(session.admit(&update(3), Some(3)), Admission::ProcessAndAck);
    }

    #[test]
    fn test_non_durable_processed_before_welcome() {
        let mut session = Session::default();
        let fired = packet(
            2,
            PacketType::GunFired {
                player_id: 1,
                origin: [0.0; 2],
                direction: 0.0,
            },
        );
        assert_eq!(session.admit(&fired, None), Admission::Process);
    }

    #[test]
    fn test_join_timeout() {
        let mut session = Session::new(5_000, 10_000);
        session.state = SessionState::JoinSent { sent_at: 1_000 };

        assert_eq!(session.check_timeouts(6_000, None), None);
        assert_eq!(
            session.check_timeouts(6_001, None),
            Some(DisconnectReason::JoinTimedOut)
        );
    }

    #[test]
    fn test_network_timeout_counts_from_last_packet() {
        let mut session = Session::new(5_000, 10_000);
        session.accept_welcome(PROTOCOL_VERSION, 0).unwrap();

        assert_eq!(session.check_timeouts(12_000, Some(5_000)), None);
        assert_eq!(
            session.check_timeouts(15_001, Some(5_000)),
            Some(DisconnectReason::TimedOut)
        );
        assert_eq!(DisconnectReason::TimedOut.to_string(), "connection timed out");
    }

    #[test]
    fn test_welcome_version_mismatch() {
        let mut session = Session::default();
        let result = session.accept_welcome(PROTOCOL_VERSION + 1, 0);

        assert!(matches!(
            result,
            Err(DisconnectReason::ProtocolMismatch { client: PROTOCOL_VERSION, .. })
        ));
        assert!(!session.is_established());
    }

    #[test]
    fn test_reset_forgets_duplicates() {
        let mut session = Session::default();
        let message = packet(
            11,
            PacketType::Message {
                sender_id: 2,
                recipient: Recipient::All,
                text: "gg".into(),
            },
        );

        session.admit(&message, Some(1));
        session.reset();

        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.admit(&message, Some(1)), Admission::ProcessAndAck);
    }

    #[test]
    fn test_kicked_reason_text() {
        assert_eq!(
            DisconnectReason::Kicked(Some("idle".into())).to_string(),
            "removed from server: idle"
        );
        assert_eq!(DisconnectReason::Kicked(None).to_string(), "removed from server");
    }
}
