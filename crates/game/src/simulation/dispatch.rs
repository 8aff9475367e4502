use std::net::SocketAddr;

use glam::Vec2;
use log::{debug, info, trace, warn};

use super::{GameClient, RoundState};
use crate::combat::{self, Shot};
use crate::event::GameEvent;
use crate::gate;
use crate::map::Map;
use crate::net::{
    DisconnectReason, DiscoveryEvent, Packet, PacketKind, PacketType, Recipient, ScoreSubject,
    Transport,
};
use crate::player::{Player, PlayerId, Team};
use crate::simulation::Clock;

impl<T: Transport, C: Clock> GameClient<T, C> {
    pub(super) fn handle_packet(&mut self, from: SocketAddr, packet: Packet, now: u64) {
        match &packet.payload {
            PacketType::InfoResponse { request_id, server } => {
                let event = self.browser.handle_info_response(
                    &mut self.transport,
                    from,
                    *request_id,
                    server.clone(),
                    now,
                );
                match event {
                    Some(DiscoveryEvent::Discovered(entry)) => {
                        self.push_event(GameEvent::ServerDiscovered(entry));
                    }
                    Some(DiscoveryEvent::Pinged(result)) => {
                        self.push_event(GameEvent::PingResult(result));
                    }
                    None => {}
                }
                return;
            }
            PacketType::HolePunch { scan_id, address } => {
                self.browser
                    .handle_hole_punch(&mut self.transport, *scan_id, address);
                return;
            }
            PacketType::UpgradeAvailable { version } => {
                if self.browser.is_metaserver(from) {
                    info!("Client upgrade {version} available");
                    self.push_event(GameEvent::UpgradeAvailable {
                        version: version.clone(),
                    });
                }
                return;
            }
            _ => {}
        }

        if self.transport.remote_addr() != Some(from) || !self.session.is_connected() {
            trace!("Dropping {:?} from unexpected {from}", packet.kind());
            return;
        }

        let local_id = self.roster.local_id();
        let admission = self.session.admit(&packet, local_id);

        if admission.should_apply() {
            self.apply(packet.payload.clone(), now);
        }

        let Some(local_id) = local_id else {
            return;
        };
        if admission.should_ack() && self.session.is_connected() {
            if let Err(e) = self
                .session
                .acknowledge(&mut self.transport, local_id, &packet, now)
            {
                warn!("Failed to acknowledge {:?}: {e}", packet.kind());
            }
        }
    }

    fn apply(&mut self, payload: PacketType, now: u64) {
        match payload {
            PacketType::Welcome {
                protocol_version,
                player_id,
                team,
            } => self.on_welcome(protocol_version, player_id, team, now),
            PacketType::Announce {
                player_id,
                name,
                team,
            } => self.on_announce(player_id, name, team),
            PacketType::Leave { player_id, message } => self.on_leave(player_id, message),
            PacketType::PlayerUpdate {
                player_id,
                position,
                velocity,
                rotation,
                rotational_velocity,
                flags,
            } => {
                let is_local = self.roster.is_local(player_id);
                let freeze_time_ms = self.config.freeze_time_ms;
                if let Some(player) = self.roster.get_mut(player_id) {
                    player.apply_update(position, velocity, rotation, rotational_velocity, flags);
                    if is_local && player.is_frozen() && player.frozen_until.is_none() {
                        player.frozen_until = Some(now.saturating_add(freeze_time_ms));
                    }
                }
            }
            PacketType::GunFired {
                player_id,
                origin,
                direction,
            } => {
                if self.roster.is_local(player_id) {
                    return;
                }
                let shot = Shot::new(player_id, Vec2::from_array(origin), direction);
                let impact = combat::resolve_shot(&shot, &self.map, &self.roster);
                self.push_event(GameEvent::ShotFired {
                    shooter_id: player_id,
                    origin: shot.origin,
                    impact,
                });
            }
            PacketType::PlayerShot {
                shooter_id,
                victim_id,
                angle,
            } => self.on_player_shot(shooter_id, victim_id, angle, now),
            PacketType::Message {
                sender_id,
                recipient,
                text,
            } => self.on_message(sender_id, recipient, text),
            PacketType::GateUpdate {
                team,
                progress,
                delta,
                ..
            } => {
                let Some(change) = gate::apply_gate_update(&mut self.map, team, progress, delta)
                else {
                    debug!("Gate update for a map without a {} gate", team.opponent());
                    return;
                };
                self.push_event(GameEvent::GateChanged {
                    gate_team: change.gate_team,
                    progress: change.progress,
                    engaged: change.current,
                });
                let own_team = self.roster.local().map(|p| p.team);
                if change.became_contested() && own_team == Some(change.gate_team) {
                    self.gate_warning_until =
                        Some(now.saturating_add(self.config.gate_warning_ms));
                    self.push_event(GameEvent::GateWarning {
                        gate_team: change.gate_team,
                    });
                }
            }
            PacketType::GameStart {
                map_name,
                time_left_ms,
                in_progress,
            } => {
                info!("Round started on {map_name} ({time_left_ms} ms left)");
                self.map.reset_round();
                self.gate.reset();
                self.gate_warning_until = None;
                self.round = RoundState {
                    in_progress: true,
                    ends_at: Some(now.saturating_add(time_left_ms)),
                };
                if !in_progress {
                    self.team_scores = [0; 2];
                }
                if let Some(local) = self.roster.local_mut() {
                    local.thaw();
                }
                self.update_due = true;
                self.push_event(GameEvent::GameStarted {
                    map_name,
                    time_left_ms,
                    in_progress,
                });
            }
            PacketType::GameStop {
                winner,
                team_scores,
            } => {
                info!("Round over, winner {winner:?}");
                self.gate.reset();
                self.round = RoundState::default();
                self.team_scores = team_scores;
                self.push_event(GameEvent::GameStopped {
                    winner,
                    team_scores,
                });
            }
            PacketType::ScoreUpdate { subject, score } => match subject {
                ScoreSubject::Player(player_id) => {
                    if let Some(player) = self.roster.get_mut(player_id) {
                        player.score = score;
                    }
                    self.push_event(GameEvent::ScoreChanged {
                        player_id: Some(player_id),
                        team: None,
                        score,
                    });
                }
                ScoreSubject::Team(team) => {
                    self.team_scores[team.index()] = score;
                    self.push_event(GameEvent::ScoreChanged {
                        player_id: None,
                        team: Some(team),
                        score,
                    });
                }
            },
            PacketType::Animation {
                player_id,
                part,
                field,
                value,
            } => self.push_event(GameEvent::Animation {
                player_id,
                part,
                field,
                value,
            }),
            PacketType::RequestDenied { request, reason } => {
                if request == PacketKind::Join {
                    self.disconnect_with(DisconnectReason::JoinDenied(reason));
                } else {
                    warn!("{request:?} denied: {reason}");
                    self.push_event(GameEvent::RequestDenied { reason });
                }
            }
            PacketType::NameChange { player_id, name } => {
                if let Some(player) = self.roster.get_mut(player_id) {
                    let old_name = std::mem::replace(&mut player.name, name.clone());
                    self.push_event(GameEvent::PlayerRenamed {
                        player_id,
                        old_name,
                        new_name: name,
                    });
                }
            }
            PacketType::TeamChange { player_id, team } => self.on_team_change(player_id, team),
            PacketType::Ack {
                kind, packet_id, ..
            } => {
                if let Some(rtt) = self.session.handle_ack(kind, packet_id, now) {
                    trace!("{kind:?} #{packet_id} acknowledged in {rtt} ms");
                }
            }
            PacketType::MapInfo {
                name,
                revision,
                width,
                height,
                object_count,
            } => {
                let valid = |extent: f32| extent.is_finite() && extent > 0.0;
                if !(valid(width) && valid(height)) {
                    warn!("Ignoring map {name} with bounds {width} x {height}");
                    return;
                }
                info!("Loading map {name} r{revision} ({object_count} objects)");
                self.map = Map::new(name, revision, width, height)
                    .with_expected_objects(object_count as usize);
                self.gate.reset();
                self.timestep.reset();
                if self.map.is_complete() {
                    self.announce_map();
                }
            }
            PacketType::MapObject(def) => {
                if !self.map.is_loaded() {
                    debug!("Map object {} before map info", def.index);
                    return;
                }
                let was_complete = self.map.is_complete();
                self.map.insert_def(&def);
                if !was_complete && self.map.is_complete() {
                    self.announce_map();
                }
            }
            PacketType::Join { .. }
            | PacketType::InfoRequest { .. }
            | PacketType::InfoResponse { .. }
            | PacketType::HolePunch { .. }
            | PacketType::UpgradeAvailable { .. } => {
                trace!("Ignoring unexpected {:?}", payload.kind());
            }
        }
    }

    fn on_welcome(&mut self, protocol_version: u32, player_id: PlayerId, team: Team, now: u64) {
        if !self.session.is_joining() {
            debug!("Ignoring WELCOME outside of a join");
            return;
        }

        if let Err(reason) = self.session.accept_welcome(protocol_version, now) {
            self.push_event(GameEvent::SystemMessage {
                text: reason.to_string(),
            });
            self.disconnect_with(reason);
            return;
        }

        info!("Welcomed as player {player_id} on team {team}");
        let player = Player::new(
            player_id,
            self.config.player_name.clone(),
            team,
            self.config.movement.player_radius,
        );
        let update = player.update_packet();
        self.roster.set_local(player);

        self.send(update);
        self.last_update_sent_at = Some(now);
        self.push_event(GameEvent::Connected { player_id, team });
    }

    fn on_announce(&mut self, player_id: PlayerId, name: String, team: Team) {
        let radius = self.config.movement.player_radius;
        if self.roster.upsert(player_id, &name, team, radius) {
            info!("{name} joined the {team} team");
            self.push_event(GameEvent::PlayerJoined {
                player_id,
                name,
                team,
            });
        }
    }

    fn on_leave(&mut self, player_id: PlayerId, message: Option<String>) {
        if self.roster.is_local(player_id) {
            self.disconnect_with(DisconnectReason::Kicked(message));
            return;
        }
        let Some(name) = self.roster.get(player_id).map(|p| p.name.clone()) else {
            return;
        };
        info!("{name} left");
        self.roster.schedule_removal(player_id);
        self.push_event(GameEvent::PlayerLeft {
            player_id,
            name,
            message,
        });
    }

    fn on_player_shot(&mut self, shooter_id: PlayerId, victim_id: PlayerId, angle: f32, now: u64) {
        self.push_event(GameEvent::PlayerHit {
            shooter_id,
            victim_id,
        });

        if !self.roster.is_local(victim_id) {
            return;
        }

        let shooter_team = self.roster.get(shooter_id).map(|p| p.team);
        let movement = self.config.movement.clone();
        let freeze_until = now.saturating_add(self.config.freeze_time_ms);
        let Some(local) = self.roster.local_mut() else {
            return;
        };

        if shooter_team == Some(local.team) {
            if !local.is_frozen() {
                return;
            }
            local.thaw();
            self.update_due = true;
            self.push_event(GameEvent::Thawed {
                player_id: victim_id,
            });
        } else {
            if local.is_frozen() {
                return;
            }
            local.freeze(freeze_until);
            local.velocity += Vec2::from_angle(angle) * movement.shot_impulse;
            local.rotational_velocity += movement.shot_spin;
            self.update_due = true;
            self.push_event(GameEvent::Frozen {
                player_id: victim_id,
            });
        }
    }

    fn on_message(&mut self, sender_id: PlayerId, recipient: Recipient, text: String) {
        let local = self.roster.local();
        let addressed = match recipient {
            Recipient::All => true,
            Recipient::Team(team) => local.is_some_and(|p| p.team == team),
            Recipient::Player(id) => local.is_some_and(|p| p.id == id),
        };
        if !addressed {
            return;
        }

        let event = match self.roster.get(sender_id) {
            Some(sender) => GameEvent::Chat {
                sender_id,
                sender_name: sender.name.clone(),
                team_only: matches!(recipient, Recipient::Team(_)),
                text,
            },
            None => GameEvent::SystemMessage { text },
        };
        self.push_event(event);
    }

    fn on_team_change(&mut self, player_id: PlayerId, team: Team) {
        let Some(old_team) = self.roster.get(player_id).map(|p| p.team) else {
            return;
        };
        if old_team == team {
            return;
        }

        if self.roster.is_local(player_id) {
            // The release must count against the gate we were holding.
            if let Some(release) = self.gate.release() {
                self.notify_gate(release, player_id, old_team);
            }
            self.update_due = true;
        }

        if let Some(player) = self.roster.get_mut(player_id) {
            player.team = team;
        }
        self.push_event(GameEvent::PlayerChangedTeam { player_id, team });
    }

    fn announce_map(&mut self) {
        let name = self.map.name().to_owned();
        let object_count = self.map.object_count();
        info!("Map {name} loaded with {object_count} objects");
        self.push_event(GameEvent::MapLoaded { name, object_count });
    }
}
