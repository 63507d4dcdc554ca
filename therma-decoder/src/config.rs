//! Poller and monitor configuration types
//!
//! This module defines the timing knobs of the library's long-running loops.
//! Link parameters (port names, baud rates) belong to the application layer.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the serial poller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Seconds between poll cycles (default: 5)
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,

    /// How long one read may wait for response bytes, in milliseconds (default: 1000)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,

    /// How long to wait for the first byte of a response after a write, in
    /// milliseconds (default: 100)
    #[serde(default = "default_response_wait")]
    pub response_wait_ms: u64,

    /// Stop after this many cycles; run until an error if unset
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_read_timeout() -> u64 {
    1000
}

fn default_response_wait() -> u64 {
    100
}

fn default_monitor_interval() -> u64 {
    60
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            read_timeout_ms: default_read_timeout(),
            response_wait_ms: default_response_wait(),
            max_cycles: None,
        }
    }
}

impl PollerConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the poll interval, rounded up to whole seconds
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_secs = whole_secs(interval);
        self
    }

    /// Set the read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the response wait
    pub fn with_response_wait(mut self, wait: Duration) -> Self {
        self.response_wait_ms = wait.as_millis() as u64;
        self
    }

    /// Stop after `cycles` poll cycles
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn response_wait(&self) -> Duration {
        Duration::from_millis(self.response_wait_ms)
    }
}

/// Seconds in `interval`, with any fraction counted as a full second
fn whole_secs(interval: Duration) -> u64 {
    let secs = interval.as_secs();
    if interval.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

/// Configuration for the bus monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Minimum seconds between emitted records (default: 60)
    #[serde(default = "default_monitor_interval")]
    pub interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval(),
        }
    }
}

impl MonitorConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flush interval, rounded up to whole seconds
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_secs = whole_secs(interval);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
