//! The per-frame client step.
//!
//! `GameClient::update` is the only entry point that advances the game: it
//! applies input, drains the network, checks timeouts, integrates physics on
//! a fixed timestep, runs gate tracking, and reports what happened through
//! the event queue. Nothing blocks; all waiting is a timestamp comparison.

mod dispatch;
mod input;
mod tick;
mod time;

use std::net::SocketAddr;

use log::{debug, info, warn};

use crate::combat::{self, Shot};
use crate::config::ClientConfig;
use crate::event::{EventQueue, GameEvent};
use crate::gate::{GateTracker, GateTransition};
use crate::map::Map;
use crate::net::{
    DisconnectReason, NetError, PacketType, ServerBrowser, ServerEntry, Session, SessionState,
    Transport,
};
use crate::physics::MovementResolver;
use crate::player::{Player, Roster, Team};

pub use input::Input;
pub use tick::FixedTimestep;
pub use time::{Clock, ManualClock, SystemClock};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundState {
    pub in_progress: bool,
    pub ends_at: Option<u64>,
}

pub struct GameClient<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    config: ClientConfig,
    session: Session,
    browser: ServerBrowser,
    roster: Roster,
    map: Map,
    resolver: MovementResolver,
    gate: GateTracker,
    timestep: FixedTimestep,
    events: EventQueue,
    round: RoundState,
    team_scores: [i32; 2],
    last_fire_at: Option<u64>,
    last_update_sent_at: Option<u64>,
    update_due: bool,
    gate_warning_until: Option<u64>,
}

impl<T: Transport, C: Clock> GameClient<T, C> {
    pub fn new(transport: T, clock: C, config: ClientConfig) -> Self {
        Self {
            session: Session::new(config.join_timeout_ms, config.network_timeout_ms),
            browser: ServerBrowser::new(
                config.server_port,
                config.metaserver_host.clone(),
                config.metaserver_port,
            ),
            roster: Roster::new(),
            map: Map::default(),
            resolver: MovementResolver::new(config.movement.clone()),
            gate: GateTracker::new(),
            timestep: FixedTimestep::new(config.physics_interval_ms, config.max_timescale),
            events: EventQueue::new(config.max_pending_events),
            round: RoundState::default(),
            team_scores: [0; 2],
            last_fire_at: None,
            last_update_sent_at: None,
            update_due: false,
            gate_warning_until: None,
            transport,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_established(&self) -> bool {
        self.session.is_established()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.roster.local()
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    /// Replaces the arena, for offline play or when the host and client
    /// share a built-in map.
    pub fn load_map(&mut self, map: Map) {
        self.map = map;
        self.timestep.reset();
    }

    pub fn round(&self) -> RoundState {
        self.round
    }

    pub fn round_time_left_ms(&self) -> Option<u64> {
        let ends_at = self.round.ends_at?;
        Some(ends_at.saturating_sub(self.clock.now_ms()))
    }

    pub fn team_scores(&self) -> [i32; 2] {
        self.team_scores
    }

    pub fn is_holding_gate(&self) -> bool {
        self.gate.is_holding()
    }

    /// Whether this team's gate came under attack within the warning window.
    pub fn gate_warning_active(&self) -> bool {
        self.gate_warning_until
            .is_some_and(|until| self.clock.now_ms() < until)
    }

    pub fn servers(&self) -> &[ServerEntry] {
        self.browser.servers()
    }

    pub fn set_metaserver_addr(&mut self, addr: SocketAddr) {
        self.browser.set_metaserver_addr(addr);
    }

    pub fn round_trip_ms(&self) -> f32 {
        self.session.srtt()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(self.clock.now_ms())
    }

    /// Leaves any current match and sends JOIN to `addr`.
    pub fn connect(&mut self, addr: SocketAddr) -> Result<(), NetError> {
        if self.session.is_connected() {
            self.disconnect();
        }

        let now = self.clock.now_ms();
        self.session.connect(
            &mut self.transport,
            addr,
            &self.config.player_name,
            self.config.team,
            now,
        )?;
        self.timestep.reset();
        self.gate.reset();
        Ok(())
    }

    /// Idempotent. LEAVE is only sent if a roster exists.
    pub fn disconnect(&mut self) {
        self.disconnect_with(DisconnectReason::Requested);
    }

    fn disconnect_with(&mut self, reason: DisconnectReason) {
        if !self.session.is_connected() && self.roster.is_empty() {
            return;
        }

        if let Some(local_id) = self.roster.local_id() {
            self.send(PacketType::Leave {
                player_id: local_id,
                message: None,
            });
        }

        info!("Disconnected: {reason}");

        self.roster.clear();
        self.map = Map::default();
        self.gate.reset();
        self.timestep.reset();
        self.round = RoundState::default();
        self.team_scores = [0; 2];
        self.last_fire_at = None;
        self.last_update_sent_at = None;
        self.update_due = false;
        self.gate_warning_until = None;
        self.session.reset();
        self.transport.disconnect();

        self.push_event(GameEvent::Disconnected { reason });
    }

    pub fn scan_all(&mut self) -> u32 {
        let now = self.clock.now_ms();
        self.browser.scan_all(&mut self.transport, now)
    }

    pub fn ping_server(&mut self, addr: SocketAddr) -> Result<u32, NetError> {
        let now = self.clock.now_ms();
        self.browser.ping_server(&mut self.transport, addr, now)
    }

    pub fn send_message(&mut self, recipient: crate::net::Recipient, text: &str) {
        let Some(sender_id) = self.roster.local_id() else {
            return;
        };
        self.send(PacketType::Message {
            sender_id,
            recipient,
            text: text.to_owned(),
        });
    }

    pub fn request_name_change(&mut self, name: &str) {
        if let Some(player_id) = self.roster.local_id() {
            self.send(PacketType::NameChange {
                player_id,
                name: name.to_owned(),
            });
        }
        self.config.player_name = name.to_owned();
    }

    pub fn request_team_change(&mut self, team: Team) {
        if let Some(player_id) = self.roster.local_id() {
            self.send(PacketType::TeamChange { player_id, team });
        }
        self.config.team = Some(team);
    }

    /// Runs one frame. Transport failures are logged; a host that stays
    /// silent is caught by the network timeout.
    pub fn update(&mut self, input: &Input) {
        let now = self.clock.now_ms();

        if self.session.is_established() {
            self.apply_input(input, now);
        }

        self.process_network(now);

        if let Some(reason) = self
            .session
            .check_timeouts(now, self.transport.last_packet_received_at())
        {
            self.disconnect_with(reason);
            return;
        }

        if self.session.is_established() && self.map.is_loaded() {
            if let Some(timescale) = self.timestep.advance(now) {
                self.step_physics(timescale);
            }
            self.expire_freeze(now);
        }

        self.roster.flush_removals();

        if self.gate_warning_until.is_some_and(|until| now >= until) {
            self.gate_warning_until = None;
        }

        self.send_periodic_update(now);
    }

    fn process_network(&mut self, now: u64) {
        let packets = match self.transport.poll_incoming() {
            Ok(packets) => packets,
            Err(e) => {
                warn!("Receive failed: {e}");
                return;
            }
        };
        for (from, packet) in packets {
            self.handle_packet(from, packet, now);
        }
    }

    fn apply_input(&mut self, input: &Input, now: u64) {
        let Some(local) = self.roster.local_mut() else {
            return;
        };

        if self.resolver.steer(local, input.aim, input.jump) {
            self.update_due = true;
        }

        if input.fire {
            self.fire(input.aim, now);
        }
    }

    fn fire(&mut self, aim: f32, now: u64) {
        let Some(local) = self.roster.local() else {
            return;
        };
        if local.is_frozen() {
            return;
        }
        if self
            .last_fire_at
            .is_some_and(|last| now.saturating_sub(last) < self.config.fire_delay_ms)
        {
            return;
        }
        self.last_fire_at = Some(now);

        let shot = Shot::new(local.id, local.position, aim);
        let impact = combat::resolve_shot(&shot, &self.map, &self.roster);
        debug!("Fired at {aim:.2} rad: {impact:?}");

        self.send(shot.fired_packet());
        if let Some(report) = impact.hit_report(&shot) {
            self.send(report);
        }
        if let Some(victim_id) = impact.victim() {
            self.push_event(GameEvent::PlayerHit {
                shooter_id: shot.shooter_id,
                victim_id,
            });
        }
        self.push_event(GameEvent::ShotFired {
            shooter_id: shot.shooter_id,
            origin: shot.origin,
            impact,
        });
    }

    fn step_physics(&mut self, timescale: f32) {
        let outcome = self.resolver.step(&mut self.roster, &self.map, timescale);
        if outcome.bounced || outcome.stopped || outcome.repelled {
            self.update_due = true;
        }

        let Some(local) = self.roster.local() else {
            return;
        };
        let (local_id, team) = (local.id, local.team);

        if let Some(transition) = self.gate.update(outcome.holding_enemy_gate) {
            self.notify_gate(transition, local_id, team);
        }
    }

    fn notify_gate(&mut self, transition: GateTransition, local_id: u32, team: Team) {
        let gate_team = team.opponent();
        debug!("Gate {gate_team} {transition:?}");
        self.send(transition.notification(local_id, team));
        self.push_event(match transition {
            GateTransition::Hold => GameEvent::GateHeld { gate_team },
            GateTransition::Release => GameEvent::GateReleased { gate_team },
        });
    }

    fn expire_freeze(&mut self, now: u64) {
        let Some(local) = self.roster.local_mut() else {
            return;
        };
        if local.is_frozen() && local.freeze_expired(now) {
            local.thaw();
            let player_id = local.id;
            self.update_due = true;
            self.push_event(GameEvent::Thawed { player_id });
        }
    }

    fn send_periodic_update(&mut self, now: u64) {
        if !self.session.is_established() {
            return;
        }
        let interval_elapsed = self
            .last_update_sent_at
            .is_none_or(|last| now.saturating_sub(last) >= self.config.update_interval_ms);
        if !(interval_elapsed || self.update_due) {
            return;
        }
        let Some(update) = self.roster.local().map(Player::update_packet) else {
            return;
        };
        self.send(update);
        self.last_update_sent_at = Some(now);
        self.update_due = false;
    }

    /// Sends to the connected host; failures are logged, not retried.
    fn send(&mut self, payload: PacketType) -> Option<u32> {
        let now = self.clock.now_ms();
        let kind = payload.kind();
        match self.session.send(&mut self.transport, payload, now) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to send {kind:?}: {e}");
                None
            }
        }
    }

    fn push_event(&mut self, event: GameEvent) {
        let now = self.clock.now_ms();
        self.events.push(now, event);
    }
}
