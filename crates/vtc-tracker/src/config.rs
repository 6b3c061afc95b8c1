//! Tracker configuration.

use std::time::Duration;

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Interval between status polls for a processing job
    pub poll_interval: Duration,
    /// Consecutive status-check failures tolerated before a job is
    /// failed. `None` keeps polling indefinitely.
    pub max_consecutive_poll_failures: Option<u32>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(3000),
            max_consecutive_poll_failures: None,
        }
    }
}

impl TrackerConfig {
    /// Create config from environment variables.
    ///
    /// `TRACKER_MAX_POLL_FAILURES` unset or `0` disables the ceiling.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_millis(
                std::env::var("TRACKER_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3000),
            ),
            max_consecutive_poll_failures: std::env::var("TRACKER_MAX_POLL_FAILURES")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|n| *n > 0),
        }
    }
}
