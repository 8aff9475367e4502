#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;

use frostgate::net::NetError;
use frostgate::{
    Clock, ClientConfig, GameClient, ManualClock, Packet, PacketHeader, PacketKind, PacketType,
    Transport,
};

pub const HOST: &str = "10.1.1.1:16876";
pub const META: &str = "10.9.9.9:16877";

pub fn host() -> SocketAddr {
    HOST.parse().unwrap()
}

pub fn meta() -> SocketAddr {
    META.parse().unwrap()
}

/// In-memory transport: inbound datagrams are queued by the test and every
/// outbound packet is recorded.
pub struct RecordingTransport {
    clock: ManualClock,
    remote: Option<SocketAddr>,
    inbound: VecDeque<(SocketAddr, Packet)>,
    pub sent: Vec<(SocketAddr, Packet)>,
    pub broadcasts: Vec<(u16, Packet)>,
    /// Every receive fails while set, as a dead socket would.
    pub fail_receive: bool,
    last_receive_at: Option<u64>,
}

impl RecordingTransport {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            remote: None,
            inbound: VecDeque::new(),
            sent: Vec::new(),
            broadcasts: Vec::new(),
            fail_receive: false,
            last_receive_at: None,
        }
    }

    pub fn deliver(&mut self, from: SocketAddr, packet: Packet) {
        self.inbound.push_back((from, packet));
    }

    pub fn take_sent(&mut self) -> Vec<Packet> {
        self.sent.drain(..).map(|(_, packet)| packet).collect()
    }

    pub fn sent_kinds(&self) -> Vec<PacketKind> {
        self.sent.iter().map(|(_, packet)| packet.kind()).collect()
    }

    pub fn acks(&self) -> Vec<(PacketKind, u32)> {
        self.sent
            .iter()
            .filter_map(|(_, packet)| match packet.payload {
                PacketType::Ack {
                    kind, packet_id, ..
                } => Some((kind, packet_id)),
                _ => None,
            })
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn connect(&mut self, addr: SocketAddr) -> Result<(), NetError> {
        self.remote = Some(addr);
        self.last_receive_at = None;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.remote = None;
    }

    fn is_connected(&self) -> bool {
        self.remote.is_some()
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote
    }

    fn send(&mut self, packet: &Packet) -> Result<usize, NetError> {
        let addr = self.remote.ok_or(NetError::NotConnected)?;
        self.send_to(addr, packet)
    }

    fn send_to(&mut self, addr: SocketAddr, packet: &Packet) -> Result<usize, NetError> {
        self.sent.push((addr, packet.clone()));
        Ok(0)
    }

    fn broadcast(&mut self, port: u16, packet: &Packet) -> Result<usize, NetError> {
        self.broadcasts.push((port, packet.clone()));
        Ok(0)
    }

    fn poll_incoming(&mut self) -> Result<Vec<(SocketAddr, Packet)>, NetError> {
        if self.fail_receive {
            return Err(NetError::Io(io::Error::other("socket closed")));
        }
        let packets: Vec<_> = self.inbound.drain(..).collect();
        if packets.iter().any(|(from, _)| Some(*from) == self.remote) {
            self.last_receive_at = Some(self.clock.now_ms());
        }
        Ok(packets)
    }

    fn last_packet_received_at(&self) -> Option<u64> {
        self.last_receive_at
    }
}

pub type TestClient = GameClient<RecordingTransport, ManualClock>;

pub fn client() -> (TestClient, ManualClock) {
    let clock = ManualClock::new(1_000);
    let config = ClientConfig {
        player_name: String::from("tester"),
        ..ClientConfig::default()
    };
    let mut client = GameClient::new(RecordingTransport::new(clock.clone()), clock.clone(), config);
    client.set_metaserver_addr(meta());
    (client, clock)
}

pub fn packet(id: u32, payload: PacketType) -> Packet {
    Packet::new(PacketHeader::new(id), payload)
}
