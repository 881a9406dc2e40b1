//! Attempt log retention

use serde::{Deserialize, Serialize};

use crate::config::check_window;
use crate::config::error::ConfigError;

/// Bounds for the in-memory attempt log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Records older than this are pruned
    pub retention_seconds: u64,
    /// Hard cap on stored records; oldest evicted first
    pub max_records: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            retention_seconds: 3600,
            max_records: 10_000,
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_window("telemetry.retention_seconds", self.retention_seconds)
    }
}
