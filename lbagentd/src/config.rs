//! Runtime configuration for the agent-check responder.

use std::path::PathBuf;
use std::time::Duration;

/// Status file consulted when `-f` is not given.
pub const DEFAULT_STATUS_FILE: &str = "/var/run/haproxy-healthcheck";

/// Environment variable that can stand in for `-f`.
pub const STATUS_FILE_ENV: &str = "LBAGENT_STATUS_FILE";

/// Interval between CPU samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Interval between status file existence checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Responder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Path of the override (status) file.
    pub status_file: PathBuf,
    /// Cadence of the CPU sampler.
    pub sample_interval: Duration,
    /// Cadence of the status file poller.
    pub poll_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_FILE)
    }
}

impl AgentConfig {
    /// Configuration with the default one-second cadences.
    pub fn new(status_file: impl Into<PathBuf>) -> Self {
        Self {
            status_file: status_file.into(),
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
