use glam::Vec2;

use crate::geometry::Polygon;
use crate::net::MapObjectDef;
use crate::player::Team;

#[derive(Debug, Clone, Copy, PartialEq, Eq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum MapObjectKind {
    Sprite,
    Obstacle,
    Gate,
}

#[derive(Debug, Clone)]
pub struct MapObject {
    pub kind: MapObjectKind,
    pub polygon: Polygon,
    pub filled: bool,
    pub team: Option<Team>,
    /// Gate opening progress in [0, 1].
    pub progress: f32,
    /// Opposing players currently engaged with this gate, as reported by the
    /// host.
    pub engaged: u32,
}

impl MapObject {
    pub fn sprite(polygon: Polygon) -> Self {
        Self {
            kind: MapObjectKind::Sprite,
            polygon,
            filled: false,
            team: None,
            progress: 0.0,
            engaged: 0,
        }
    }

    pub fn obstacle(polygon: Polygon) -> Self {
        Self {
            kind: MapObjectKind::Obstacle,
            polygon,
            filled: true,
            team: None,
            progress: 0.0,
            engaged: 0,
        }
    }

    pub fn gate(team: Team, polygon: Polygon) -> Self {
        Self {
            kind: MapObjectKind::Gate,
            polygon,
            filled: true,
            team: Some(team),
            progress: 0.0,
            engaged: 0,
        }
    }

    pub fn from_def(def: &MapObjectDef) -> Self {
        let polygon = Polygon::new(def.points.iter().copied().map(Vec2::from_array).collect());
        Self {
            kind: def.kind,
            polygon,
            filled: def.filled,
            team: def.team,
            progress: 0.0,
            engaged: 0,
        }
    }

    pub fn is_gate(&self) -> bool {
        self.kind == MapObjectKind::Gate
    }

    pub fn gate_team(&self) -> Option<Team> {
        if self.is_gate() { self.team } else { None }
    }

    /// Filled obstacles always collide; a gate stops colliding once fully
    /// open.
    pub fn is_collidable(&self) -> bool {
        if !self.filled {
            return false;
        }
        match self.kind {
            MapObjectKind::Sprite => false,
            MapObjectKind::Obstacle => true,
            MapObjectKind::Gate => self.progress < 1.0,
        }
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.progress = progress.clamp(0.0, 1.0);
    }

    /// Applies a +1/-1 engagement delta and returns the previous count.
    pub fn apply_engagement(&mut self, delta: i8) -> u32 {
        let previous = self.engaged;
        self.engaged = self.engaged.saturating_add_signed(delta as i32);
        previous
    }

    pub fn reset_round(&mut self) {
        self.progress = 0.0;
        self.engaged = 0;
    }
}
