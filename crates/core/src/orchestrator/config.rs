//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the download orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum downloads running at once.
    /// Queued jobs wait until a slot frees up.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// How long completed/error entries stay in the status cache (seconds).
    #[serde(default = "default_status_ttl")]
    pub status_ttl_secs: u64,

    /// How often expired status entries are swept (milliseconds).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_ms: u64,

    /// Capacity of the job event broadcast channel.
    /// Slow subscribers lose the oldest events beyond this.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Capacity of the command channel into the coordinator.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_status_ttl() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    1000 // 1 second
}

fn default_event_buffer() -> usize {
    256
}

fn default_command_buffer() -> usize {
    64
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            status_ttl_secs: default_status_ttl(),
            sweep_interval_ms: default_sweep_interval(),
            event_buffer: default_event_buffer(),
            command_buffer: default_command_buffer(),
        }
    }
}
