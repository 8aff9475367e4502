//! LAN and directory-server discovery.
//!
//! A scan sends INFO requests three ways at once: broadcast on the default
//! port, straight to localhost, and to the directory ("meta") server. The
//! directory server answers with the address of a match host behind NAT;
//! the client queries that host directly so its reply punches through.
//! Pings share the INFO request path but use ids with the top bit set so a
//! ping reply can never be mistaken for a scan result.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};

use log::{debug, info, trace, warn};

use super::protocol::{
    DEFAULT_METASERVER_HOST, DEFAULT_PORT, METASERVER_PORT, PROTOCOL_VERSION, Packet,
    PacketHeader, PacketType, ServerInfo,
};
use super::transport::{NetError, Transport};

pub const PING_ID_FLAG: u32 = 1 << 31;

/// Unanswered pings older than this are forgotten.
pub const PING_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerEntry {
    pub addr: SocketAddr,
    pub info: ServerInfo,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PingResult {
    pub addr: SocketAddr,
    pub info: ServerInfo,
    pub latency_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ScanSession {
    pub scan_id: u32,
    pub started_at: u64,
    pub servers: Vec<ServerEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryEvent {
    Discovered(ServerEntry),
    Pinged(PingResult),
}

#[derive(Debug)]
struct PendingPing {
    addr: SocketAddr,
    sent_at: u64,
}

#[derive(Debug)]
pub struct ServerBrowser {
    server_port: u16,
    metaserver_host: String,
    metaserver_port: u16,
    metaserver_addr: Option<SocketAddr>,
    next_scan_id: u32,
    next_ping_id: u32,
    scan: Option<ScanSession>,
    pings: HashMap<u32, PendingPing>,
}

impl Default for ServerBrowser {
    fn default() -> Self {
        Self::new(DEFAULT_PORT, DEFAULT_METASERVER_HOST, METASERVER_PORT)
    }
}

impl ServerBrowser {
    pub fn new(server_port: u16, metaserver_host: impl Into<String>, metaserver_port: u16) -> Self {
        Self {
            server_port,
            metaserver_host: metaserver_host.into(),
            metaserver_port,
            metaserver_addr: None,
            next_scan_id: 1,
            next_ping_id: 1,
            scan: None,
            pings: HashMap::new(),
        }
    }

    pub fn scan(&self) -> Option<&ScanSession> {
        self.scan.as_ref()
    }

    pub fn servers(&self) -> &[ServerEntry] {
        self.scan
            .as_ref()
            .map(|scan| scan.servers.as_slice())
            .unwrap_or_default()
    }

    pub fn pending_pings(&self) -> usize {
        self.pings.len()
    }

    pub fn is_metaserver(&self, addr: SocketAddr) -> bool {
        self.metaserver_addr == Some(addr)
    }

    /// Uses a fixed directory server address instead of resolving the
    /// configured host on each scan.
    pub fn set_metaserver_addr(&mut self, addr: SocketAddr) {
        self.metaserver_addr = Some(addr);
        self.metaserver_host = addr.ip().to_string();
        self.metaserver_port = addr.port();
    }

    /// Starts a new scan, replacing any previous one. Unreachable targets are
    /// logged and skipped; the scan id is returned either way.
    pub fn scan_all<T: Transport>(&mut self, transport: &mut T, now_ms: u64) -> u32 {
        let scan_id = self.next_scan_id;
        self.next_scan_id = (self.next_scan_id.wrapping_add(1) & !PING_ID_FLAG).max(1);

        self.scan = Some(ScanSession {
            scan_id,
            started_at: now_ms,
            servers: Vec::new(),
        });

        let request = info_request(scan_id);

        if let Err(e) = transport.broadcast(self.server_port, &request) {
            warn!("Broadcast scan failed: {e}");
        }

        let localhost = SocketAddr::from((Ipv4Addr::LOCALHOST, self.server_port));
        if let Err(e) = transport.send_to(localhost, &request) {
            warn!("Localhost scan failed: {e}");
        }

        match self.resolve_metaserver() {
            Ok(addr) => {
                if let Err(e) = transport.send_to(addr, &request) {
                    warn!("Directory server query failed: {e}");
                }
            }
            Err(e) => warn!("{e}"),
        }

        info!("Scan {scan_id} started");
        scan_id
    }

    /// Sends an INFO request to one host. The reply surfaces as a
    /// `PingResult` and never touches the scan list.
    pub fn ping_server<T: Transport>(
        &mut self,
        transport: &mut T,
        addr: SocketAddr,
        now_ms: u64,
    ) -> Result<u32, NetError> {
        self.expire_pings(now_ms);

        let ping_id = PING_ID_FLAG | self.next_ping_id;
        self.next_ping_id = (self.next_ping_id.wrapping_add(1) & !PING_ID_FLAG).max(1);

        transport.send_to(addr, &info_request(ping_id))?;
        self.pings.insert(
            ping_id,
            PendingPing {
                addr,
                sent_at: now_ms,
            },
        );

        debug!("Ping {ping_id:#x} sent to {addr}");
        Ok(ping_id)
    }

    pub fn handle_info_response<T: Transport>(
        &mut self,
        transport: &mut T,
        from: SocketAddr,
        request_id: u32,
        info: ServerInfo,
        now_ms: u64,
    ) -> Option<DiscoveryEvent> {
        if request_id & PING_ID_FLAG != 0 {
            let Some(ping) = self.pings.remove(&request_id) else {
                trace!("Discarding reply to unknown ping {request_id:#x} from {from}");
                return None;
            };
            return Some(DiscoveryEvent::Pinged(PingResult {
                addr: ping.addr,
                info,
                latency_ms: now_ms.saturating_sub(ping.sent_at),
            }));
        }

        let scan_id = match &self.scan {
            Some(scan) if scan.scan_id == request_id => scan.scan_id,
            _ => {
                trace!("Discarding stale scan reply {request_id} from {from}");
                return None;
            }
        };

        if self.is_metaserver(from) {
            match info.address.as_deref() {
                Some(address) => self.query_introduced(transport, scan_id, address),
                None => debug!("Directory reply without host address"),
            }
            return None;
        }

        let scan = self.scan.as_mut()?;
        if scan.servers.iter().any(|entry| entry.addr == from) {
            return None;
        }

        let entry = ServerEntry {
            addr: from,
            info,
            latency_ms: now_ms.saturating_sub(scan.started_at),
        };
        info!(
            "Found {:?} at {from} ({} ms)",
            entry.info.name, entry.latency_ms
        );
        scan.servers.push(entry.clone());
        Some(DiscoveryEvent::Discovered(entry))
    }

    /// Directory server introduction of a host for the current scan.
    pub fn handle_hole_punch<T: Transport>(&mut self, transport: &mut T, scan_id: u32, address: &str) {
        if self.scan.as_ref().is_some_and(|scan| scan.scan_id == scan_id) {
            self.query_introduced(transport, scan_id, address);
        } else {
            trace!("Ignoring hole punch for stale scan {scan_id}");
        }
    }

    /// Introduced hosts must be numeric; a DNS lookup here would stall the
    /// frame loop.
    fn query_introduced<T: Transport>(&self, transport: &mut T, scan_id: u32, address: &str) {
        let Some(addr) = parse_numeric(address, self.server_port) else {
            warn!("Ignoring non-numeric introduced host {address:?}");
            return;
        };
        debug!("Querying introduced host {addr}");
        if let Err(e) = transport.send_to(addr, &info_request(scan_id)) {
            warn!("Query to {addr} failed: {e}");
        }
    }

    fn resolve_metaserver(&mut self) -> Result<SocketAddr, NetError> {
        if let Some(addr) = self.metaserver_addr {
            return Ok(addr);
        }
        let addr = (self.metaserver_host.as_str(), self.metaserver_port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.find(SocketAddr::is_ipv4))
            .ok_or_else(|| NetError::Resolve(self.metaserver_host.clone()))?;
        self.metaserver_addr = Some(addr);
        Ok(addr)
    }

    fn expire_pings(&mut self, now_ms: u64) {
        self.pings
            .retain(|_, ping| now_ms.saturating_sub(ping.sent_at) <= PING_TIMEOUT_MS);
    }

    pub fn clear(&mut self) {
        self.scan = None;
        self.pings.clear();
    }
}

fn info_request(request_id: u32) -> Packet {
    Packet::new(
        PacketHeader::new(request_id),
        PacketType::InfoRequest {
            request_id,
            protocol_version: PROTOCOL_VERSION,
        },
    )
}

/// Parses `ip:port` or a bare IP without touching DNS.
pub fn parse_numeric(address: &str, default_port: u16) -> Option<SocketAddr> {
    address.parse().ok().or_else(|| {
        let ip: IpAddr = address.parse().ok()?;
        Some(SocketAddr::new(ip, default_port))
    })
}

/// Parses `host:port`, falling back to `default_port` for a bare host.
/// May block on DNS.
pub fn resolve(address: &str, default_port: u16) -> Option<SocketAddr> {
    if let Ok(addr) = address.parse() {
        return Some(addr);
    }
    address
        .to_socket_addrs()
        .or_else(|_| (address, default_port).to_socket_addrs())
        .ok()?
        .next()
}
