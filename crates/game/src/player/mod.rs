mod config;
mod roster;
mod state;

pub use config::MovementConfig;
pub use roster::Roster;
pub use state::{Player, PlayerFlags, PlayerId, Team};
