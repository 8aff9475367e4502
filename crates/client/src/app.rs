use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{info, warn};

use frostgate::net::Recipient;
use frostgate::{
    ClientConfig, GameClient, GameEvent, Input, PacketLossSimulation, ShotImpact, SystemClock,
    UdpEndpoint,
};

type Client = GameClient<UdpEndpoint<SystemClock>, SystemClock>;

pub struct App {
    client: Client,
}

impl App {
    pub fn new(config: ClientConfig, simulation: PacketLossSimulation) -> Result<Self> {
        let clock = SystemClock::new();
        let endpoint = UdpEndpoint::bind_any(clock)?.with_simulation(simulation);

        Ok(Self {
            client: GameClient::new(endpoint, clock, config),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.client.transport().local_addr()
    }

    pub fn scan(&mut self, duration: Duration) {
        let scan_id = self.client.scan_all();
        info!("Scanning for {} s (scan {scan_id})", duration.as_secs());

        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            self.client.update(&Input::default());
            self.drain_events();
            thread::sleep(Duration::from_millis(1));
        }

        let servers = self.client.servers();
        if servers.is_empty() {
            info!("No servers found");
        }
        for entry in servers {
            info!(
                "{:<24} {:<21} {:<16} {}v{} {:>4} ms",
                entry.info.name,
                entry.addr,
                entry.info.map_name,
                entry.info.team_counts[0],
                entry.info.team_counts[1],
                entry.latency_ms
            );
        }
    }

    pub fn ping(&mut self, addr: SocketAddr, duration: Duration) -> Result<()> {
        let ping_id = self.client.ping_server(addr)?;
        info!("Pinging {addr} (ping {ping_id:#x})");

        let deadline = Instant::now() + duration;
        let mut answered = false;
        while Instant::now() < deadline && !answered {
            self.client.update(&Input::default());
            for event in self.client.drain_events() {
                answered |= matches!(event, GameEvent::PingResult(_));
                log_event(&event);
            }
            thread::sleep(Duration::from_millis(1));
        }

        if !answered {
            warn!("No reply from {addr}");
        }
        Ok(())
    }

    /// Joins `addr` and idles until disconnected or the time limit passes.
    pub fn play(
        &mut self,
        addr: SocketAddr,
        limit: Option<Duration>,
        message: Option<&str>,
    ) -> Result<()> {
        self.client.connect(addr)?;
        info!("Joining {addr}");

        let deadline = limit.map(|limit| Instant::now() + limit);
        let mut pending_message = message.map(str::to_owned);

        let mut connected = true;
        while connected {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                info!("Time limit reached");
                break;
            }

            self.client.update(&Input::default());

            for event in self.client.drain_events() {
                log_event(&event);
                match event {
                    GameEvent::Connected { .. } => {
                        if let Some(text) = pending_message.take() {
                            self.client.send_message(Recipient::All, &text);
                        }
                    }
                    GameEvent::Disconnected { .. } => {
                        connected = false;
                    }
                    _ => {}
                }
            }

            thread::sleep(Duration::from_millis(1));
        }

        self.client.disconnect();
        self.drain_events();

        let stats = self.client.transport().stats();
        info!(
            "Sent {} packets ({} bytes), received {} ({} bytes), {} dropped, {} malformed",
            stats.packets_sent,
            stats.bytes_sent,
            stats.packets_received,
            stats.bytes_received,
            stats.packets_dropped,
            stats.malformed_received
        );
        Ok(())
    }

    fn drain_events(&mut self) {
        for event in self.client.drain_events() {
            log_event(&event);
        }
    }
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::Connected { player_id, team } => {
            info!("Joined as player {player_id} on the {team} team");
        }
        GameEvent::Disconnected { reason } => info!("Disconnected: {reason}"),
        GameEvent::SystemMessage { text } => info!("* {text}"),
        GameEvent::Chat {
            sender_name,
            team_only,
            text,
            ..
        } => {
            let scope = if *team_only { " (team)" } else { "" };
            info!("<{sender_name}>{scope} {text}");
        }
        GameEvent::PlayerJoined { name, team, .. } => info!("{name} joined {team}"),
        GameEvent::PlayerLeft { name, message, .. } => match message {
            Some(message) => info!("{name} left: {message}"),
            None => info!("{name} left"),
        },
        GameEvent::PlayerRenamed {
            old_name, new_name, ..
        } => info!("{old_name} is now {new_name}"),
        GameEvent::PlayerChangedTeam { player_id, team } => {
            info!("Player {player_id} moved to {team}");
        }
        GameEvent::ShotFired {
            shooter_id, impact, ..
        } => match impact {
            ShotImpact::None => {}
            _ => log::debug!("Player {shooter_id} shot: {impact:?}"),
        },
        GameEvent::PlayerHit {
            shooter_id,
            victim_id,
        } => info!("Player {shooter_id} hit player {victim_id}"),
        GameEvent::Frozen { player_id } => info!("Player {player_id} frozen"),
        GameEvent::Thawed { player_id } => info!("Player {player_id} thawed"),
        GameEvent::GateHeld { gate_team } => info!("Holding the {gate_team} gate"),
        GameEvent::GateReleased { gate_team } => info!("Released the {gate_team} gate"),
        GameEvent::GateChanged {
            gate_team,
            progress,
            engaged,
        } => log::debug!("{gate_team} gate at {:.0}% ({engaged} engaged)", progress * 100.0),
        GameEvent::GateWarning { gate_team } => warn!("The {gate_team} gate is under attack"),
        GameEvent::GameStarted {
            map_name,
            time_left_ms,
            ..
        } => info!("Round on {map_name}, {} s left", time_left_ms / 1000),
        GameEvent::GameStopped {
            winner,
            team_scores,
        } => match winner {
            Some(team) => info!("{team} wins {}:{}", team_scores[0], team_scores[1]),
            None => info!("Draw {}:{}", team_scores[0], team_scores[1]),
        },
        GameEvent::ScoreChanged { .. } | GameEvent::Animation { .. } => {
            log::trace!("{event:?}");
        }
        GameEvent::MapLoaded { name, object_count } => {
            info!("Map {name} loaded ({object_count} objects)");
        }
        GameEvent::RequestDenied { reason } => warn!("Request denied: {reason}"),
        GameEvent::UpgradeAvailable { version } => info!("Version {version} is available"),
        GameEvent::ServerDiscovered(entry) => {
            info!("Found {} at {}", entry.info.name, entry.addr);
        }
        GameEvent::PingResult(result) => {
            info!("{} replied in {} ms", result.addr, result.latency_ms);
        }
    }
}
