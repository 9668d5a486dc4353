//! Fixed-interval retry policy and the counters the session keeps.

use std::time::Duration;

/// How long the session waits between cycles.
///
/// Both intervals are fixed: no backoff and no jitter, so the reconnect
/// cadence seen by the server is exactly what was configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after a failed connection or a failed sampling pass.
    pub retry_period: Duration,
    /// Wait after a fully successful sampling pass.
    pub measurement_period: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_period: Duration::from_secs(5),
            measurement_period: Duration::from_secs(600),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next cycle given whether the last one succeeded.
    pub fn delay_after(&self, succeeded: bool) -> Duration {
        if succeeded {
            self.measurement_period
        } else {
            self.retry_period
        }
    }
}

/// Counters mutated only by the running session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Failed connection attempts since the last successful one.
    pub consecutive_failed_connections: u64,
    /// Sampling passes that uploaded every channel.
    pub successful_passes: u64,
}

impl RetryState {
    /// Returns the new consecutive failure count.
    pub fn record_connect_failure(&mut self) -> u64 {
        self.consecutive_failed_connections += 1;
        self.consecutive_failed_connections
    }

    pub fn record_connected(&mut self) {
        self.consecutive_failed_connections = 0;
    }

    /// Returns the new total of successful passes.
    pub fn record_pass(&mut self) -> u64 {
        self.successful_passes += 1;
        self.successful_passes
    }
}
