pub mod combat;
pub mod config;
pub mod event;
pub mod gate;
pub mod geometry;
pub mod map;
pub mod net;
pub mod physics;
pub mod player;
pub mod simulation;

pub use combat::{Shot, ShotImpact, resolve_shot};
pub use config::{ClientConfig, METASERVER_ENV};
pub use event::{EventQueue, GameEvent, PendingEvent, Retention};
pub use gate::{GateState, GateTracker, GateTransition};
pub use geometry::Polygon;
pub use map::{Map, MapObject, MapObjectKind, TestingGround};
pub use net::{
    DEFAULT_PORT, DisconnectReason, NetError, NetworkStats, Packet, PacketError, PacketHeader,
    PacketKind, PacketLossSimulation, PacketType, PingResult, Recipient, ServerBrowser,
    ServerEntry, ServerInfo, Session, SessionState, Transport, UdpEndpoint,
};
pub use physics::{MovementResolver, StepOutcome};
pub use player::{MovementConfig, Player, PlayerFlags, PlayerId, Roster, Team};
pub use simulation::{Clock, FixedTimestep, GameClient, Input, ManualClock, SystemClock};
