use rkyv::util::AlignedVec;
use rkyv::{rancor, Archive, Deserialize, Serialize};

use crate::map::MapObjectKind;
use crate::player::{PlayerId, Team};

pub const MAX_PACKET_SIZE: usize = 1200;
pub const PROTOCOL_VERSION: u32 = 3;
pub const PROTOCOL_MAGIC: u32 = 0x4652_4F53;
pub const DEFAULT_PORT: u16 = 16876;
pub const METASERVER_PORT: u16 = 16877;
pub const DEFAULT_METASERVER_HOST: &str = "meta.frostgate.net";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct PacketHeader {
    pub magic: u32,
    pub packet_id: u32,
}

impl PacketHeader {
    pub fn new(packet_id: u32) -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            packet_id,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC
    }
}

/// Type tag of a packet, carried by ACK and REQUEST_DENIED to name the
/// packet they refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum PacketKind {
    Join,
    Welcome,
    Announce,
    Leave,
    PlayerUpdate,
    GunFired,
    PlayerShot,
    Message,
    GateUpdate,
    GameStart,
    GameStop,
    ScoreUpdate,
    Animation,
    RequestDenied,
    NameChange,
    TeamChange,
    Ack,
    InfoRequest,
    InfoResponse,
    HolePunch,
    UpgradeAvailable,
    MapInfo,
    MapObject,
}

impl PacketKind {
    /// Packets the host retransmits until acknowledged. A PLAYER_UPDATE is
    /// only durable when it is addressed to the local player.
    pub fn is_durable(self) -> bool {
        matches!(
            self,
            Self::Announce
                | Self::Leave
                | Self::PlayerShot
                | Self::Message
                | Self::GateUpdate
                | Self::GameStart
                | Self::GameStop
                | Self::ScoreUpdate
                | Self::NameChange
                | Self::TeamChange
                | Self::MapInfo
                | Self::MapObject
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum Recipient {
    All,
    Team(Team),
    Player(PlayerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ScoreSubject {
    Player(PlayerId),
    Team(Team),
}

/// Match host descriptor returned by INFO. The directory server fills in
/// `address` with the host it is introducing; hosts answering directly
/// leave it empty and are identified by the datagram source.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct ServerInfo {
    pub address: Option<String>,
    pub name: String,
    pub map_name: String,
    pub protocol_version: u32,
    pub team_counts: [u8; 2],
    pub max_players: u8,
    pub uptime_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct MapObjectDef {
    pub index: u32,
    pub kind: MapObjectKind,
    pub team: Option<Team>,
    pub points: Vec<[f32; 2]>,
    pub filled: bool,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum PacketType {
    Join {
        protocol_version: u32,
        name: String,
        team: Option<Team>,
    },
    Welcome {
        protocol_version: u32,
        player_id: PlayerId,
        team: Team,
    },
    Announce {
        player_id: PlayerId,
        name: String,
        team: Team,
    },
    Leave {
        player_id: PlayerId,
        message: Option<String>,
    },
    PlayerUpdate {
        player_id: PlayerId,
        position: [f32; 2],
        velocity: [f32; 2],
        rotation: f32,
        rotational_velocity: f32,
        flags: u8,
    },
    GunFired {
        player_id: PlayerId,
        origin: [f32; 2],
        direction: f32,
    },
    PlayerShot {
        shooter_id: PlayerId,
        victim_id: PlayerId,
        angle: f32,
    },
    Message {
        sender_id: PlayerId,
        recipient: Recipient,
        text: String,
    },
    GateUpdate {
        player_id: PlayerId,
        team: Team,
        progress: f32,
        delta: i8,
    },
    GameStart {
        map_name: String,
        time_left_ms: u64,
        in_progress: bool,
    },
    GameStop {
        winner: Option<Team>,
        team_scores: [i32; 2],
    },
    ScoreUpdate {
        subject: ScoreSubject,
        score: i32,
    },
    Animation {
        player_id: PlayerId,
        part: String,
        field: String,
        value: i32,
    },
    RequestDenied {
        request: PacketKind,
        reason: String,
    },
    NameChange {
        player_id: PlayerId,
        name: String,
    },
    TeamChange {
        player_id: PlayerId,
        team: Team,
    },
    Ack {
        player_id: PlayerId,
        kind: PacketKind,
        packet_id: u32,
    },
    InfoRequest {
        request_id: u32,
        protocol_version: u32,
    },
    InfoResponse {
        request_id: u32,
        server: ServerInfo,
    },
    HolePunch {
        scan_id: u32,
        address: String,
    },
    UpgradeAvailable {
        version: String,
    },
    MapInfo {
        name: String,
        revision: u32,
        width: f32,
        height: f32,
        object_count: u32,
    },
    MapObject(MapObjectDef),
}

impl PacketType {
    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Join { .. } => PacketKind::Join,
            Self::Welcome { .. } => PacketKind::Welcome,
            Self::Announce { .. } => PacketKind::Announce,
            Self::Leave { .. } => PacketKind::Leave,
            Self::PlayerUpdate { .. } => PacketKind::PlayerUpdate,
            Self::GunFired { .. } => PacketKind::GunFired,
            Self::PlayerShot { .. } => PacketKind::PlayerShot,
            Self::Message { .. } => PacketKind::Message,
            Self::GateUpdate { .. } => PacketKind::GateUpdate,
            Self::GameStart { .. } => PacketKind::GameStart,
            Self::GameStop { .. } => PacketKind::GameStop,
            Self::ScoreUpdate { .. } => PacketKind::ScoreUpdate,
            Self::Animation { .. } => PacketKind::Animation,
            Self::RequestDenied { .. } => PacketKind::RequestDenied,
            Self::NameChange { .. } => PacketKind::NameChange,
            Self::TeamChange { .. } => PacketKind::TeamChange,
            Self::Ack { .. } => PacketKind::Ack,
            Self::InfoRequest { .. } => PacketKind::InfoRequest,
            Self::InfoResponse { .. } => PacketKind::InfoResponse,
            Self::HolePunch { .. } => PacketKind::HolePunch,
            Self::UpgradeAvailable { .. } => PacketKind::UpgradeAvailable,
            Self::MapInfo { .. } => PacketKind::MapInfo,
            Self::MapObject(_) => PacketKind::MapObject,
        }
    }

    /// Whether the host expects an ACK for this payload once it has been
    /// applied. `local_id` is the id assigned by WELCOME, if any.
    pub fn requires_ack(&self, local_id: Option<PlayerId>) -> bool {
        match self {
            Self::PlayerUpdate { player_id, .. } => Some(*player_id) == local_id,
            other => other.kind().is_durable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: PacketType,
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl Packet {
    pub fn new(header: PacketHeader, payload: PacketType) -> Self {
        Self { header, payload }
    }

    pub fn kind(&self) -> PacketKind {
        self.payload.kind()
    }

    pub fn id(&self) -> u32 {
        self.header.packet_id
    }

    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)
    }

    /// Decodes a whole datagram. Validation runs over the full archive, so a
    /// truncated or corrupted packet is rejected rather than partially read.
    pub fn deserialize(data: &[u8]) -> Result<Self, PacketError> {
        let mut aligned = AlignedVec::<16>::with_capacity(data.len());
        aligned.extend_from_slice(data);
        rkyv::from_bytes::<Self, rancor::Error>(&aligned).map_err(PacketError::Deserialize)
    }
}
