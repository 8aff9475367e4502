use serde::{Deserialize, Serialize};

use crate::net::{
    DEFAULT_JOIN_TIMEOUT_MS, DEFAULT_METASERVER_HOST, DEFAULT_NETWORK_TIMEOUT_MS, DEFAULT_PORT,
    METASERVER_PORT,
};
use crate::player::{MovementConfig, Team};

/// Overrides the directory server host.
pub const METASERVER_ENV: &str = "FROSTGATE_METASERVER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub player_name: String,
    /// Preferred team; `None` lets the host balance.
    pub team: Option<Team>,
    pub server_port: u16,
    pub metaserver_host: String,
    pub metaserver_port: u16,
    pub join_timeout_ms: u64,
    pub network_timeout_ms: u64,
    pub physics_interval_ms: u64,
    pub max_timescale: f32,
    pub update_interval_ms: u64,
    pub fire_delay_ms: u64,
    pub freeze_time_ms: u64,
    pub gate_warning_ms: u64,
    pub max_pending_events: usize,
    pub movement: MovementConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            player_name: String::from("player"),
            team: None,
            server_port: DEFAULT_PORT,
            metaserver_host: String::from(DEFAULT_METASERVER_HOST),
            metaserver_port: METASERVER_PORT,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
            network_timeout_ms: DEFAULT_NETWORK_TIMEOUT_MS,
            physics_interval_ms: 20,
            max_timescale: 8.0,
            update_interval_ms: 50,
            fire_delay_ms: 700,
            freeze_time_ms: 10_000,
            gate_warning_ms: 3_000,
            max_pending_events: 256,
            movement: MovementConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(std::env::var(METASERVER_ENV).ok().as_deref());
        config
    }

    fn apply_env(&mut self, metaserver: Option<&str>) {
        if let Some(host) = metaserver.map(str::trim).filter(|h| !h.is_empty()) {
            log::debug!("Directory server overridden to {host}");
            self.metaserver_host = host.to_owned();
        }
    }
}
