//! Process-wide tuning knobs with TOML file support.
//!
//! Defaults match the protocol constants; a deployment can override them
//! from a TOML file. `max_messages_per_packet` is a wire-format constant
//! and is deliberately not configurable.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Hard wire-format bound: a datagram carries at most this many messages.
pub const MAX_MESSAGES_PER_PACKET: usize = 8;

/// Hard wire-format bound on a lattice proposal set.
pub const MAX_PROPOSAL_SET_SIZE: usize = 1000;

/// Tunable runtime parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tuning {
    /// Datagrams emitted per link per send tick.
    #[serde(default = "default_send_window_size")]
    pub send_window_size: u32,

    /// Period of the sender worker tick, in milliseconds.
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,

    /// Period of the event-log flush tick, in milliseconds.
    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    /// Backpressure threshold: the broadcast loop pauses while any link's
    /// outbound queue is longer than this.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Multiplier on `send_window_size * MAX_MESSAGES_PER_PACKET` bounding
    /// the per-link pending (unacked) map.
    #[serde(default = "default_pending_factor")]
    pub pending_factor: usize,
}

fn default_send_window_size() -> u32 {
    8
}

fn default_send_interval_ms() -> u64 {
    5
}

fn default_log_interval_ms() -> u64 {
    500
}

fn default_max_queue_size() -> usize {
    1 << 16
}

fn default_pending_factor() -> usize {
    4
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            send_window_size: default_send_window_size(),
            send_interval_ms: default_send_interval_ms(),
            log_interval_ms: default_log_interval_ms(),
            max_queue_size: default_max_queue_size(),
            pending_factor: default_pending_factor(),
        }
    }
}

impl Tuning {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Capacity of the per-link pending map.
    pub fn pending_capacity(&self) -> usize {
        self.send_window_size as usize * MAX_MESSAGES_PER_PACKET * self.pending_factor
    }
}
