//! Mission scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::check_window;
use crate::config::error::ConfigError;

/// Configuration for mission admission and the background tick.
///
/// The mission queue is bounded: once `max_queue_size` missions are waiting,
/// new submissions are rejected and callers are expected to retry later.
///
/// # Example
///
/// ```toml
/// [scheduler]
/// max_queue_size = 100
/// tick_interval_ms = 1000
/// throughput_window_seconds = 300
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of queued missions.
    ///
    /// Default: 100
    pub max_queue_size: usize,

    /// Interval between background attempts to start the queue head.
    ///
    /// Default: 1000 ms
    pub tick_interval_ms: u64,

    /// Trailing window used for the throughput metric.
    ///
    /// Default: 300 seconds
    pub throughput_window_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 100,
            tick_interval_ms: 1000,
            throughput_window_seconds: 300,
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Validation {
                field: "scheduler.tick_interval_ms".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        check_window(
            "scheduler.throughput_window_seconds",
            self.throughput_window_seconds,
        )
    }
}
