mod discovery;
mod endpoint;
mod protocol;
mod session;
mod simulator;
mod stats;
mod tracking;
mod transport;

pub use discovery::{
    DiscoveryEvent, PING_ID_FLAG, PING_TIMEOUT_MS, PingResult, ScanSession, ServerBrowser,
    ServerEntry, parse_numeric, resolve,
};
pub use endpoint::UdpEndpoint;
pub use protocol::{
    ArchivedPacket, DEFAULT_METASERVER_HOST, DEFAULT_PORT, MAX_PACKET_SIZE, METASERVER_PORT,
    MapObjectDef, PROTOCOL_MAGIC, PROTOCOL_VERSION, Packet, PacketError, PacketHeader, PacketKind,
    PacketType, Recipient, ScoreSubject, ServerInfo,
};
pub use session::{
    Admission, DEFAULT_JOIN_TIMEOUT_MS, DEFAULT_NETWORK_TIMEOUT_MS, DisconnectReason, Session,
    SessionState,
};
pub use simulator::LinkSimulator;
pub use stats::{NetworkStats, PacketLossSimulation};
pub use tracking::{AckTracker, DuplicateFilter};
pub use transport::{NetError, Transport};
