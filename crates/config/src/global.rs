//! Global configuration settings

use std::time::Duration;

use serde::Deserialize;

/// Default number of successful deliveries between progress reports
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10;

/// Default bound on waiting for each worker at shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Settings that apply across the pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Report progress every Nth successful delivery per sink
    /// Default: 10
    pub progress_interval: u64,

    /// How long to wait for each source worker to stop after a stop request
    /// Default: 5
    pub shutdown_timeout_secs: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl GlobalConfig {
    /// Shutdown timeout as a `Duration`
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
