//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often the job monitor polls in-flight batches
    #[serde(rename = "monitor-interval-secs", default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,

    /// Upper bound on any single call to the backend
    #[serde(rename = "call-timeout-secs", default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// How often the trigger set checks for due rules
    #[serde(rename = "tick-interval-secs", default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Whether a batch that ended in `error` still fires its chained launches
    #[serde(rename = "chain-on-error", default = "default_chain_on_error")]
    pub chain_on_error: bool,

    /// Where the daemon writes its status snapshot (None disables it)
    #[serde(rename = "status-file", default = "default_status_file")]
    pub status_file: Option<PathBuf>,
}

fn default_monitor_interval_secs() -> u64 {
    120
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_tick_interval_secs() -> u64 {
    30
}

fn default_chain_on_error() -> bool {
    true
}

/// Default snapshot location: ~/.local/share/tierscan/status.json
pub fn default_status_file() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tierscan").join("status.json"))
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: default_monitor_interval_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            tick_interval_secs: default_tick_interval_secs(),
            chain_on_error: default_chain_on_error(),
            status_file: default_status_file(),
        }
    }
}

impl SchedulerConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}
