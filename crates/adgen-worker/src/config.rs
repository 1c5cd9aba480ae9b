//! Worker configuration.

use std::time::Duration;

use crate::poller::PollPolicy;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling cadence and give-up deadline for batch jobs
    pub poll: PollPolicy,
    /// Write raw batch results to the artifact store
    pub archive_results: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll: PollPolicy::default(),
            archive_results: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = PollPolicy::default();

        Self {
            poll: PollPolicy {
                interval: Duration::from_secs(
                    std::env::var("WORKER_POLL_INTERVAL_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(defaults.interval.as_secs()),
                ),
                timeout: Duration::from_secs(
                    std::env::var("WORKER_POLL_TIMEOUT_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(defaults.timeout.as_secs()),
                ),
            },
            archive_results: std::env::var("WORKER_ARCHIVE_RESULTS")
                .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
        }
    }
}
