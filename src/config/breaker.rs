//! Circuit breaker configuration

use serde::{Deserialize, Serialize};

use crate::config::check_window;
use crate::config::error::ConfigError;

/// Circuit breaker thresholds.
///
/// # Example
///
/// ```toml
/// [breaker]
/// failure_threshold = 5
/// half_open_delay_seconds = 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens
    pub failure_threshold: u32,
    /// Cooldown before a single half-open probe is allowed
    pub half_open_delay_seconds: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            half_open_delay_seconds: 30,
        }
    }
}

impl BreakerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Validation {
                field: "breaker.failure_threshold".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        check_window("breaker.half_open_delay_seconds", self.half_open_delay_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_defaults() {
        let config = BreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.half_open_delay_seconds, 30);
    }

    #[test]
    fn test_breaker_zero_threshold_rejected() {
        let config = BreakerConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_breaker_oversized_delay_rejected() {
        let config = BreakerConfig {
            half_open_delay_seconds: 10_000_000_000_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
