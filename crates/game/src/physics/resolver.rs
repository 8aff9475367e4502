use glam::Vec2;

use crate::geometry;
use crate::map::Map;
use crate::player::{MovementConfig, Player, Roster};

/// What happened to the local player during one call to `step`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOutcome {
    /// Unfrozen and within reach of the opposing team's gate at the end of
    /// the step.
    pub holding_enemy_gate: bool,
    pub bounced: bool,
    pub stopped: bool,
    pub repelled: bool,
}

pub struct MovementResolver {
    config: MovementConfig,
}

impl Default for MovementResolver {
    fn default() -> Self {
        Self::new(MovementConfig::default())
    }
}

impl MovementResolver {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Applies steering. Frozen players keep drifting and ignore input.
    pub fn steer(&self, player: &mut Player, aim: f32, jump: bool) -> bool {
        if player.is_frozen() {
            return false;
        }
        player.rotation = aim;
        if jump && player.is_stationary(self.config.stationary_epsilon) {
            player.velocity = Vec2::from_angle(aim) * self.config.jump_speed;
            return true;
        }
        false
    }

    /// Advances every player by `timescale` ticks. Timescales above 1.0 are
    /// split into whole-tick sub-steps so collision response never runs on
    /// an oversized step.
    pub fn step(&self, roster: &mut Roster, map: &Map, timescale: f32) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        let mut remaining = timescale.max(0.0);

        while remaining > f32::EPSILON {
            let slice = remaining.min(1.0);
            remaining -= slice;

            if let Some(local) = roster.local_mut() {
                let sub = self.step_local(local, map, slice);
                outcome.holding_enemy_gate = sub.holding_enemy_gate;
                outcome.bounced |= sub.bounced;
                outcome.stopped |= sub.stopped;
                outcome.repelled |= sub.repelled;
            }

            for remote in roster.remotes_mut() {
                remote.position += remote.velocity * slice;
                remote.rotation += remote.rotational_velocity * slice;
            }
        }

        outcome
    }

    fn step_local(&self, player: &mut Player, map: &Map, timescale: f32) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        let bounces = player.is_frozen() && player.is_visible();
        let old_position = player.position;

        player.rotation += player.rotational_velocity * timescale;
        let mut position = old_position + player.velocity * timescale;

        let (min, max) = map.bounds();
        for axis in 0..2 {
            if position[axis] >= min[axis] && position[axis] <= max[axis] {
                continue;
            }
            position[axis] = position[axis].clamp(min[axis], max[axis]);
            if bounces {
                player.velocity[axis] = -player.velocity[axis];
                player.velocity *= self.config.bounce_damping;
                outcome.bounced = true;
            } else {
                player.stop();
                outcome.stopped = true;
            }
        }

        // First approaching obstacle in map order wins.
        for (_, object) in map.objects() {
            if !object.is_collidable() {
                continue;
            }
            let old_distance = object.polygon.signed_distance(old_position);
            let Some(contact) = object.polygon.circle_contact(position, player.radius) else {
                continue;
            };
            if contact.distance >= old_distance {
                continue;
            }

            position = old_position;
            if bounces {
                let normal = Vec2::from_angle(contact.angle);
                player.velocity =
                    geometry::reflect(player.velocity, normal) * self.config.bounce_damping;
                outcome.bounced = true;
            } else {
                player.stop();
                outcome.stopped = true;
            }
            break;
        }

        let reach = player.radius + self.config.gate_reach;
        for (_, object) in map.objects() {
            let Some(gate_team) = object.gate_team() else {
                continue;
            };
            let Some(contact) = object.polygon.circle_contact(position, reach) else {
                continue;
            };
            if player.is_frozen() {
                player.velocity += contact.normal * self.config.gate_repel_impulse;
                outcome.repelled = true;
            } else if gate_team != player.team {
                outcome.holding_enemy_gate = true;
            }
        }

        player.position = position;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use crate::map::MapObject;
    use crate::player::{PlayerFlags, Team};

    fn roster_with(position: Vec2, velocity: Vec2, frozen: bool) -> Roster {
        let mut player = Player::new(1, "local", Team::Blue, 10.0);
        player.position = position;
        player.velocity = velocity;
        if frozen {
            player.freeze(u64::MAX);
        }
        let mut roster = Roster::new();
        roster.set_local(player);
        roster
    }

    fn empty_map() -> Map {
        Map::new("empty", 1, 200.0, 100.0)
    }

    fn local(roster: &Roster) -> &Player {
        roster.local().unwrap()
    }

    #[test]
    fn test_boundary_clamp_hard_stop() {
        let resolver = MovementResolver::default();
        let map = empty_map();

        for (start, velocity) in [
            (Vec2::new(5.0, 50.0), Vec2::new(-20.0, 3.0)),
            (Vec2::new(195.0, 50.0), Vec2::new(30.0, 0.0)),
            (Vec2::new(100.0, 2.0), Vec2::new(0.0, -9.0)),
            (Vec2::new(100.0, 99.0), Vec2::new(1.0, 50.0)),
            (Vec2::new(199.0, 99.0), Vec2::new(50.0, 50.0)),
        ] {
            let mut roster = roster_with(start, velocity, false);
            resolver.step(&mut roster, &map, 1.0);

            let player = local(&roster);
            let on_x = player.position.x == 0.0 || player.position.x == 200.0;
            let on_y = player.position.y == 0.0 || player.position.y == 100.0;
            assert!(on_x || on_y, "{:?} not on boundary", player.position);
            assert!(map.contains(player.position));
            assert_eq!(player.velocity, Vec2::ZERO);
            assert_eq!(player.rotational_velocity, 0.0);
        }
    }

    #[test]
    fn test_frozen_boundary_bounce_damps() {
        let resolver = MovementResolver::default();
        let map = empty_map();
        let mut roster = roster_with(Vec2::new(195.0, 50.0), Vec2::new(10.0, 4.0), true);

        let before = local(&roster).velocity.length();
        let outcome = resolver.step(&mut roster, &map, 1.0);

        let player = local(&roster);
        assert!(outcome.bounced);
        assert_eq!(player.position.x, 200.0);
        assert!(player.velocity.x < 0.0);
        assert!(player.velocity.length() <= before * 0.9 + 1e-4);
    }

    #[test]
    fn test_repeated_bounces_never_gain_energy() {
        let resolver = MovementResolver::default();
        let mut map = Map::new("box", 1, 300.0, 300.0);
        map.push(MapObject::obstacle(Polygon::rectangle(
            Vec2::new(140.0, 140.0),
            Vec2::new(160.0, 160.0),
        )));
        let mut roster = roster_with(Vec2::new(40.0, 60.0), Vec2::new(13.0, 7.0), true);

        let mut bounces = 0;
        for _ in 0..400 {
            let before = local(&roster).velocity.length();
            let outcome = resolver.step(&mut roster, &map, 1.0);
            let after = local(&roster).velocity.length();
            if outcome.bounced {
                bounces += 1;
                assert!(after <= before * 0.9 + 1e-4, "{after} > 0.9 * {before}");
            } else {
                assert!(after <= before + 1e-4);
            }
        }
        assert!(bounces > 3);
    }

    #[test]
    fn test_invisible_frozen_player_stops() {
        let resolver = MovementResolver::default();
        let map = empty_map();
        let mut roster = roster_with(Vec2::new(195.0, 50.0), Vec2::new(10.0, 0.0), true);
        roster.local_mut().unwrap().flags.insert(PlayerFlags::INVISIBLE);

        let outcome = resolver.step(&mut roster, &map, 1.0);

        assert!(outcome.stopped);
        assert_eq!(local(&roster).velocity, Vec2::ZERO);
    }

    #[test]
    fn test_obstacle_hard_stop_keeps_old_position() {
        let resolver = MovementResolver::default();
        let mut map = empty_map();
        map.push(MapObject::obstacle(Polygon::rectangle(
            Vec2::new(100.0, 0.0),
            Vec2::new(120.0, 100.0),
        )));
        let mut roster = roster_with(Vec2::new(85.0, 50.0), Vec2::new(8.0, 0.0), false);

        let outcome = resolver.step(&mut roster, &map, 1.0);

        assert!(outcome.stopped);
        assert_eq!(local(&roster).position, Vec2::new(85.0, 50.0));
        assert_eq!(local(&roster).velocity, Vec2::ZERO);
    }

    #[test]
    fn test_receding_from_obstacle_is_free() {
        let resolver = MovementResolver::default();
        let mut map = empty_map();
        map.push(MapObject::obstacle(Polygon::rectangle(
            Vec2::new(100.0, 0.0),
            Vec2::new(120.0, 100.0),
        )));
        let mut roster = roster_with(Vec2::new(95.0, 50.0), Vec2::new(-3.0, 0.0), false);

        let outcome = resolver.step(&mut roster, &map, 1.0);

        assert!(!outcome.stopped);
        assert_eq!(local(&roster).position, Vec2::new(92.0, 50.0));
    }

    #[test]
    fn test_obstacle_bounce_mirrors_velocity() {
        let resolver = MovementResolver::default();
        let mut map = empty_map();
        map.push(MapObject::obstacle(Polygon::rectangle(
            Vec2::new(100.0, 0.0),
            Vec2::new(120.0, 100.0),
        )));
        let mut roster = roster_with(Vec2::new(85.0, 50.0), Vec2::new(8.0, 2.0), true);

        resolver.step(&mut roster, &map, 1.0);

        let player = local(&roster);
        assert!(player.velocity.x < 0.0);
        assert!(player.velocity.y > 0.0);
        assert!((player.velocity.x + 7.2).abs() < 1e-3);
    }

    #[test]
    fn test_large_timescale_substeps_hit_walls() {
        let resolver = MovementResolver::default();
        let mut map = Map::new("corridor", 1, 1000.0, 100.0);
        map.push(MapObject::obstacle(Polygon::rectangle(
            Vec2::new(100.0, 0.0),
            Vec2::new(110.0, 100.0),
        )));
        let mut roster = roster_with(Vec2::new(50.0, 50.0), Vec2::new(12.0, 0.0), false);

        resolver.step(&mut roster, &map, 10.0);

        let player = local(&roster);
        assert!(player.position.x < 100.0);
        assert_eq!(player.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_gate_engagement_requires_enemy_gate_and_thawed_player() {
        let resolver = MovementResolver::default();
        let mut map = empty_map();
        map.push(MapObject::gate(
            Team::Red,
            Polygon::rectangle(Vec2::new(150.0, 40.0), Vec2::new(160.0, 60.0)),
        ));

        let mut roster = roster_with(Vec2::new(135.0, 50.0), Vec2::ZERO, false);
        assert!(resolver.step(&mut roster, &map, 1.0).holding_enemy_gate);

        roster.local_mut().unwrap().team = Team::Red;
        assert!(!resolver.step(&mut roster, &map, 1.0).holding_enemy_gate);

        let mut roster = roster_with(Vec2::new(135.0, 50.0), Vec2::ZERO, true);
        let outcome = resolver.step(&mut roster, &map, 1.0);
        assert!(!outcome.holding_enemy_gate);
        assert!(outcome.repelled);
        assert!(local(&roster).velocity.x < 0.0);
    }

    #[test]
    fn test_remote_players_dead_reckon() {
        let resolver = MovementResolver::default();
        let map = empty_map();
        let mut roster = roster_with(Vec2::new(50.0, 50.0), Vec2::ZERO, false);
        roster.upsert(2, "remote", Team::Red, 10.0);
        {
            let remote = roster.get_mut(2).unwrap();
            remote.position = Vec2::new(10.0, 10.0);
            remote.velocity = Vec2::new(2.0, -1.0);
        }

        resolver.step(&mut roster, &map, 2.5);

        assert_eq!(roster.get(2).unwrap().position, Vec2::new(15.0, 7.5));
    }

    #[test]
    fn test_frozen_player_ignores_steering() {
        let resolver = MovementResolver::default();
        let mut player = Player::new(1, "p", Team::Blue, 10.0);

        assert!(resolver.steer(&mut player, 0.0, true));
        assert!((player.velocity.x - resolver.config().jump_speed).abs() < 1e-5);

        let mut frozen = Player::new(2, "f", Team::Blue, 10.0);
        frozen.freeze(100);
        assert!(!resolver.steer(&mut frozen, 1.0, true));
        assert_eq!(frozen.velocity, Vec2::ZERO);
        assert_eq!(frozen.rotation, 0.0);
    }
}
