use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::net::PacketType;

pub type PlayerId = u32;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum Team {
    Blue,
    Red,
}

impl Team {
    pub fn opponent(self) -> Self {
        match self {
            Self::Blue => Self::Red,
            Self::Red => Self::Blue,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Blue => 0,
            Self::Red => 1,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blue => f.write_str("blue"),
            Self::Red => f.write_str("red"),
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PlayerFlags: u8 {
        const FROZEN = 1 << 0;
        const INVISIBLE = 1 << 1;
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub rotational_velocity: f32,
    pub radius: f32,
    pub flags: PlayerFlags,
    pub score: i32,
    /// Clock time (ms) at which a locally applied freeze expires.
    pub frozen_until: Option<u64>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, team: Team, radius: f32) -> Self {
        debug_assert!(radius > 0.0);
        Self {
            id,
            name: name.into(),
            team,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            rotational_velocity: 0.0,
            radius,
            flags: PlayerFlags::empty(),
            score: 0,
            frozen_until: None,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.flags.contains(PlayerFlags::FROZEN)
    }

    pub fn is_visible(&self) -> bool {
        !self.flags.contains(PlayerFlags::INVISIBLE)
    }

    pub fn is_stationary(&self, epsilon: f32) -> bool {
        self.velocity.length_squared() <= epsilon * epsilon
    }

    pub fn freeze(&mut self, until: u64) {
        self.flags.insert(PlayerFlags::FROZEN);
        self.frozen_until = Some(until);
    }

    pub fn thaw(&mut self) {
        self.flags.remove(PlayerFlags::FROZEN);
        self.frozen_until = None;
    }

    pub fn stop(&mut self) {
        self.velocity = Vec2::ZERO;
        self.rotational_velocity = 0.0;
    }

    pub fn freeze_expired(&self, now: u64) -> bool {
        self.frozen_until.is_some_and(|until| now >= until)
    }

    /// Full-state PLAYER_UPDATE payload for this player.
    pub fn update_packet(&self) -> PacketType {
        PacketType::PlayerUpdate {
            player_id: self.id,
            position: self.position.to_array(),
            velocity: self.velocity.to_array(),
            rotation: self.rotation,
            rotational_velocity: self.rotational_velocity,
            flags: self.flags.bits(),
        }
    }

    pub fn apply_update(
        &mut self,
        position: [f32; 2],
        velocity: [f32; 2],
        rotation: f32,
        rotational_velocity: f32,
        flags: u8,
    ) {
        self.position = Vec2::from_array(position);
        self.velocity = Vec2::from_array(velocity);
        self.rotation = rotation;
        self.rotational_velocity = rotational_velocity;
        self.flags = PlayerFlags::from_bits_truncate(flags);
        if !self.is_frozen() {
            self.frozen_until = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_opponent() {
        assert_eq!(Team::Blue.opponent(), Team::Red);
        assert_eq!(Team::Red.opponent().opponent(), Team::Red);
        assert_ne!(Team::Blue.index(), Team::Red.index());
    }

    #[test]
    fn test_freeze_and_thaw() {
        let mut player = Player::new(1, "bob", Team::Red, 16.0);
        player.freeze(500);

        assert!(player.is_frozen());
        assert!(!player.freeze_expired(499));
        assert!(player.freeze_expired(500));

        player.thaw();
        assert!(!player.is_frozen());
        assert_eq!(player.frozen_until, None);
    }

    #[test]
    fn test_update_clears_freeze_deadline() {
        let mut player = Player::new(1, "bob", Team::Red, 16.0);
        player.freeze(500);

        player.apply_update([10.0, 20.0], [1.0, 0.0], 0.5, 0.0, 0);

        assert!(!player.is_frozen());
        assert_eq!(player.frozen_until, None);
        assert_eq!(player.position, Vec2::new(10.0, 20.0));
    }

    #[test]
    fn test_unknown_flag_bits_ignored() {
        let mut player = Player::new(1, "bob", Team::Red, 16.0);
        player.apply_update([0.0, 0.0], [0.0, 0.0], 0.0, 0.0, 0b1000_0010);

        assert_eq!(player.flags, PlayerFlags::INVISIBLE);
        assert!(!player.is_visible());
    }
}
