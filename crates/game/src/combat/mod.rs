//! Hit-scan shot resolution.

use glam::Vec2;

use crate::geometry;
use crate::map::Map;
use crate::net::PacketType;
use crate::player::{PlayerId, Roster};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub shooter_id: PlayerId,
    pub origin: Vec2,
    /// Fire direction in radians.
    pub direction: f32,
}

impl Shot {
    pub fn new(shooter_id: PlayerId, origin: Vec2, direction: f32) -> Self {
        Self {
            shooter_id,
            origin,
            direction,
        }
    }

    pub fn unit_direction(&self) -> Vec2 {
        Vec2::from_angle(self.direction)
    }

    pub fn fired_packet(&self) -> PacketType {
        PacketType::GunFired {
            player_id: self.shooter_id,
            origin: self.origin.to_array(),
            direction: self.direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShotImpact {
    Obstacle { point: Vec2, object: u32 },
    Player { player_id: PlayerId, point: Vec2 },
    Boundary { point: Vec2 },
    None,
}

impl ShotImpact {
    pub fn point(&self) -> Option<Vec2> {
        match *self {
            Self::Obstacle { point, .. } | Self::Player { point, .. } | Self::Boundary { point } => {
                Some(point)
            }
            Self::None => None,
        }
    }

    pub fn victim(&self) -> Option<PlayerId> {
        match *self {
            Self::Player { player_id, .. } => Some(player_id),
            _ => None,
        }
    }

    /// PLAYER_SHOT report owed to the host, if a player was hit.
    pub fn hit_report(&self, shot: &Shot) -> Option<PacketType> {
        self.victim().map(|victim_id| PacketType::PlayerShot {
            shooter_id: shot.shooter_id,
            victim_id,
            angle: shot.direction,
        })
    }
}

/// Resolves `shot` against map geometry and, when the shooter is the local
/// player, against every other player. Remote shooters only ever hit
/// geometry here; their player hits arrive from the host as PLAYER_SHOT.
pub fn resolve_shot(shot: &Shot, map: &Map, roster: &Roster) -> ShotImpact {
    let origin = shot.origin;
    let direction = shot.unit_direction();

    let mut nearest_obstacle: Option<(f32, Vec2, u32)> = None;
    for (index, object) in map.objects() {
        if !object.is_collidable() {
            continue;
        }
        let reach = origin.distance(object.polygon.centroid())
            + 2.0 * object.polygon.bounding_radius()
            + 1.0;
        let Some(hit) = object.polygon.ray_intersection(origin, origin + direction * reach)
        else {
            continue;
        };
        if nearest_obstacle.is_none_or(|(best, _, _)| hit.distance < best) {
            nearest_obstacle = Some((hit.distance, hit.point, index));
        }
    }

    if roster.is_local(shot.shooter_id) {
        let limit = nearest_obstacle.map_or(f32::INFINITY, |(distance, _, _)| distance);
        if let Some((player_id, point)) = nearest_player(shot, direction, limit, map, roster) {
            return ShotImpact::Player { player_id, point };
        }
    }

    if let Some((_, point, object)) = nearest_obstacle {
        return ShotImpact::Obstacle { point, object };
    }

    let (min, max) = map.bounds();
    match geometry::ray_rect_exit(origin, direction, min, max) {
        Some(point) => ShotImpact::Boundary { point },
        None => ShotImpact::None,
    }
}

fn nearest_player(
    shot: &Shot,
    direction: Vec2,
    limit: f32,
    map: &Map,
    roster: &Roster,
) -> Option<(PlayerId, Vec2)> {
    let segment_length = if limit.is_finite() {
        limit
    } else {
        2.0 * map.diagonal() + shot.origin.length() + 1.0
    };

    let mut best: Option<(f32, PlayerId, Vec2)> = None;
    for player in roster.iter() {
        if player.id == shot.shooter_id {
            continue;
        }
        if shot.origin.distance(player.position) > limit {
            continue;
        }
        let t = geometry::project_onto_ray(shot.origin, direction, player.position);
        if t < 0.0 {
            continue;
        }
        let closest = shot.origin + direction * t.min(segment_length);
        if closest.distance(player.position) >= player.radius {
            continue;
        }
        let along = t.min(segment_length);
        if best.is_none_or(|(best_t, _, _)| along < best_t) {
            best = Some((along, player.id, closest));
        }
    }

    best.map(|(_, id, point)| (id, point))
}
