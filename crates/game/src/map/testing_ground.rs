use glam::Vec2;

use crate::geometry::Polygon;
use crate::player::Team;

use super::{Map, MapObject};

/// Small built-in arena: a central pillar, two side walls and one gate per
/// team. Used by the offline sandbox and by tests.
pub struct TestingGround;

impl TestingGround {
    pub const NAME: &'static str = "testing-ground";
    pub const WIDTH: f32 = 1200.0;
    pub const HEIGHT: f32 = 800.0;

    pub fn map() -> Map {
        let mut map = Map::new(Self::NAME, 1, Self::WIDTH, Self::HEIGHT);

        Self::add_obstacles(&mut map);
        Self::add_gates(&mut map);
        Self::add_decorations(&mut map);

        map
    }

    fn add_obstacles(map: &mut Map) {
        map.push(MapObject::obstacle(Polygon::rectangle(
            Vec2::new(560.0, 340.0),
            Vec2::new(640.0, 460.0),
        )));

        map.push(MapObject::obstacle(Polygon::rectangle(
            Vec2::new(300.0, 0.0),
            Vec2::new(320.0, 250.0),
        )));

        map.push(MapObject::obstacle(Polygon::rectangle(
            Vec2::new(880.0, 550.0),
            Vec2::new(900.0, 800.0),
        )));

        map.push(MapObject::obstacle(Polygon::new(vec![
            Vec2::new(500.0, 700.0),
            Vec2::new(600.0, 620.0),
            Vec2::new(700.0, 700.0),
        ])));
    }

    fn add_gates(map: &mut Map) {
        map.push(MapObject::gate(
            Team::Blue,
            Polygon::rectangle(Vec2::new(40.0, 360.0), Vec2::new(60.0, 440.0)),
        ));

        map.push(MapObject::gate(
            Team::Red,
            Polygon::rectangle(Vec2::new(1140.0, 360.0), Vec2::new(1160.0, 440.0)),
        ));
    }

    fn add_decorations(map: &mut Map) {
        map.push(MapObject::sprite(Polygon::rectangle(
            Vec2::new(100.0, 100.0),
            Vec2::new(200.0, 150.0),
        )));
    }

    pub fn spawn_point(team: Team) -> Vec2 {
        match team {
            Team::Blue => Vec2::new(150.0, 400.0),
            Team::Red => Vec2::new(1050.0, 400.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testing_ground_layout() {
        let map = TestingGround::map();

        assert!(map.is_complete());
        assert!(map.gate(Team::Blue).is_some());
        assert!(map.gate(Team::Red).is_some());

        for team in [Team::Blue, Team::Red] {
            let spawn = TestingGround::spawn_point(team);
            assert!(map.contains(spawn));
            for (_, object) in map.objects().filter(|(_, o)| o.is_collidable()) {
                assert!(object.polygon.signed_distance(spawn) > 16.0);
            }
        }
    }
}
