use glam::Vec2;

use crate::combat::ShotImpact;
use crate::net::{DisconnectReason, PingResult, ServerEntry};
use crate::player::{PlayerId, Team};

/// How long an undelivered event stays worth showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Cosmetic; the first to go when the queue is full.
    Transient,
    /// Expires `ttl_ms` after it was raised.
    Expiring { ttl_ms: u64 },
    /// Kept until drained.
    Persistent,
}

impl Retention {
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent)
    }

    pub fn ttl_ms(&self) -> Option<u64> {
        match self {
            Self::Expiring { ttl_ms } => Some(*ttl_ms),
            _ => None,
        }
    }
}

/// Outward notifications for a front end. The core never draws; it reports.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Connected {
        player_id: PlayerId,
        team: Team,
    },
    Disconnected {
        reason: DisconnectReason,
    },
    SystemMessage {
        text: String,
    },
    Chat {
        sender_id: PlayerId,
        sender_name: String,
        team_only: bool,
        text: String,
    },
    PlayerJoined {
        player_id: PlayerId,
        name: String,
        team: Team,
    },
    PlayerLeft {
        player_id: PlayerId,
        name: String,
        message: Option<String>,
    },
    PlayerRenamed {
        player_id: PlayerId,
        old_name: String,
        new_name: String,
    },
    PlayerChangedTeam {
        player_id: PlayerId,
        team: Team,
    },
    ShotFired {
        shooter_id: PlayerId,
        origin: Vec2,
        impact: ShotImpact,
    },
    PlayerHit {
        shooter_id: PlayerId,
        victim_id: PlayerId,
    },
    Frozen {
        player_id: PlayerId,
    },
    Thawed {
        player_id: PlayerId,
    },
    GateHeld {
        gate_team: Team,
    },
    GateReleased {
        gate_team: Team,
    },
    GateChanged {
        gate_team: Team,
        progress: f32,
        engaged: u32,
    },
    /// An opposing player has started on this team's gate.
    GateWarning {
        gate_team: Team,
    },
    GameStarted {
        map_name: String,
        time_left_ms: u64,
        in_progress: bool,
    },
    GameStopped {
        winner: Option<Team>,
        team_scores: [i32; 2],
    },
    ScoreChanged {
        player_id: Option<PlayerId>,
        team: Option<Team>,
        score: i32,
    },
    Animation {
        player_id: PlayerId,
        part: String,
        field: String,
        value: i32,
    },
    MapLoaded {
        name: String,
        object_count: usize,
    },
    RequestDenied {
        reason: String,
    },
    UpgradeAvailable {
        version: String,
    },
    ServerDiscovered(ServerEntry),
    PingResult(PingResult),
}

impl GameEvent {
    pub fn retention(&self) -> Retention {
        match self {
            Self::Connected { .. }
            | Self::Disconnected { .. }
            | Self::GameStarted { .. }
            | Self::GameStopped { .. }
            | Self::MapLoaded { .. }
            | Self::UpgradeAvailable { .. }
            | Self::ServerDiscovered(_)
            | Self::PingResult(_) => Retention::Persistent,

            Self::SystemMessage { .. }
            | Self::Chat { .. }
            | Self::RequestDenied { .. }
            | Self::PlayerJoined { .. }
            | Self::PlayerLeft { .. }
            | Self::PlayerRenamed { .. }
            | Self::PlayerChangedTeam { .. } => Retention::Expiring { ttl_ms: 30_000 },

            Self::PlayerHit { .. }
            | Self::Frozen { .. }
            | Self::Thawed { .. }
            | Self::GateHeld { .. }
            | Self::GateReleased { .. }
            | Self::GateWarning { .. }
            | Self::ScoreChanged { .. } => Retention::Expiring { ttl_ms: 5_000 },

            Self::ShotFired { .. } | Self::GateChanged { .. } | Self::Animation { .. } => {
                Retention::Transient
            }
        }
    }
}
