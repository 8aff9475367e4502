use std::io;
use std::net::SocketAddr;

use super::protocol::{Packet, PacketError};

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error("no remote host")]
    NotConnected,
    #[error("packet of {0} bytes exceeds the datagram limit")]
    Oversize(usize),
    #[error("could not resolve {0}")]
    Resolve(String),
}

/// Raw, unordered, lossy datagram link. The session layer builds its
/// acknowledgment discipline on top; implementations never retransmit.
pub trait Transport {
    /// Points the link at a match host.
    fn connect(&mut self, addr: SocketAddr) -> Result<(), NetError>;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn remote_addr(&self) -> Option<SocketAddr>;

    /// Sends to the connected host.
    fn send(&mut self, packet: &Packet) -> Result<usize, NetError>;

    fn send_to(&mut self, addr: SocketAddr, packet: &Packet) -> Result<usize, NetError>;

    /// Sends to the local broadcast address on `port`.
    fn broadcast(&mut self, port: u16, packet: &Packet) -> Result<usize, NetError>;

    /// Drains every datagram that has arrived, without blocking. Datagrams
    /// that fail to decode are dropped here.
    fn poll_incoming(&mut self) -> Result<Vec<(SocketAddr, Packet)>, NetError>;

    /// Clock time of the most recent packet from the connected host.
    fn last_packet_received_at(&self) -> Option<u64>;
}
