use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub player_radius: f32,

    pub bounce_damping: f32,
    pub jump_speed: f32,
    pub stationary_epsilon: f32,

    pub gate_reach: f32,
    pub gate_repel_impulse: f32,

    pub shot_impulse: f32,
    pub shot_spin: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            player_radius: 16.0,

            bounce_damping: 0.9,
            jump_speed: 6.0,
            stationary_epsilon: 0.01,

            gate_reach: 8.0,
            gate_repel_impulse: 1.5,

            shot_impulse: 2.0,
            shot_spin: 0.2,
        }
    }
}
