mod objects;
mod testing_ground;

use std::collections::BTreeMap;

use glam::Vec2;

use crate::net::MapObjectDef;
use crate::player::Team;

pub use objects::{MapObject, MapObjectKind};
pub use testing_ground::TestingGround;

/// Arena geometry. Objects are keyed by their index so that MAP_OBJECT
/// packets arriving out of order still iterate in map order.
#[derive(Debug, Clone, Default)]
pub struct Map {
    name: String,
    revision: u32,
    width: f32,
    height: f32,
    expected_objects: usize,
    objects: BTreeMap<u32, MapObject>,
    loaded: bool,
}

impl Map {
    pub fn new(name: impl Into<String>, revision: u32, width: f32, height: f32) -> Self {
        Self {
            name: name.into(),
            revision,
            width,
            height,
            expected_objects: 0,
            objects: BTreeMap::new(),
            loaded: true,
        }
    }

    pub fn with_expected_objects(mut self, count: usize) -> Self {
        self.expected_objects = count;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn bounds(&self) -> (Vec2, Vec2) {
        (Vec2::ZERO, Vec2::new(self.width, self.height))
    }

    pub fn diagonal(&self) -> f32 {
        self.width.hypot(self.height)
    }

    /// Whether MAP_INFO has been received for the current map.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether every object announced by MAP_INFO has arrived.
    pub fn is_complete(&self) -> bool {
        self.loaded && self.objects.len() >= self.expected_objects
    }

    pub fn push(&mut self, object: MapObject) -> u32 {
        let index = self
            .objects
            .keys()
            .next_back()
            .map_or(0, |&last| last + 1);
        self.objects.insert(index, object);
        index
    }

    pub fn insert_def(&mut self, def: &MapObjectDef) {
        self.objects.insert(def.index, MapObject::from_def(def));
    }

    pub fn objects(&self) -> impl Iterator<Item = (u32, &MapObject)> {
        self.objects.iter().map(|(&index, object)| (index, object))
    }

    pub fn object(&self, index: u32) -> Option<&MapObject> {
        self.objects.get(&index)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn gate(&self, team: Team) -> Option<&MapObject> {
        self.objects.values().find(|o| o.gate_team() == Some(team))
    }

    pub fn gate_mut(&mut self, team: Team) -> Option<&mut MapObject> {
        self.objects
            .values_mut()
            .find(|o| o.gate_team() == Some(team))
    }

    pub fn reset_round(&mut self) {
        for object in self.objects.values_mut() {
            object.reset_round();
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.y >= 0.0 && point.x <= self.width && point.y <= self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;

    #[test]
    fn test_out_of_order_objects_iterate_by_index() {
        let mut map = Map::new("arena", 1, 100.0, 100.0).with_expected_objects(2);

        let def = |index| MapObjectDef {
            index,
            kind: MapObjectKind::Obstacle,
            team: None,
            points: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
            filled: true,
        };

        map.insert_def(&def(1));
        assert!(!map.is_complete());
        map.insert_def(&def(0));
        assert!(map.is_complete());

        let indices: Vec<u32> = map.objects().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_gate_lookup_and_reset() {
        let mut map = Map::new("arena", 1, 100.0, 100.0);
        map.push(MapObject::obstacle(Polygon::rectangle(
            Vec2::ZERO,
            Vec2::splat(5.0),
        )));
        map.push(MapObject::gate(
            Team::Red,
            Polygon::rectangle(Vec2::splat(50.0), Vec2::splat(60.0)),
        ));

        let gate = map.gate_mut(Team::Red).unwrap();
        gate.set_progress(0.5);
        gate.apply_engagement(1);

        map.reset_round();

        let gate = map.gate(Team::Red).unwrap();
        assert_eq!(gate.progress, 0.0);
        assert_eq!(gate.engaged, 0);
        assert!(map.gate(Team::Blue).is_none());
    }

    #[test]
    fn test_default_map_is_not_loaded() {
        let map = Map::default();
        assert!(!map.is_loaded());
        assert!(!map.is_complete());
    }
}
