//! Configuration for the router and scheduler
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`RELAY_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use relay::config::RelayConfig;
//!
//! let config = RelayConfig::default();
//! assert_eq!(config.scheduler.max_queue_size, 100);
//!
//! let toml = r#"
//! [scheduler]
//! max_queue_size = 10
//! "#;
//! let config: RelayConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.scheduler.max_queue_size, 10);
//! assert_eq!(config.breaker.failure_threshold, 5);
//! ```

pub mod breaker;
pub mod budget;
pub mod error;
pub mod logging;
pub mod routing;
pub mod scheduler;
pub mod scoring;
pub mod telemetry;
pub mod worker;

pub use breaker::BreakerConfig;
pub use budget::BudgetConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use routing::RoutingConfig;
pub use scheduler::SchedulerConfig;
pub use scoring::{DomainProfile, ScoringConfig};
pub use telemetry::TelemetryConfig;
pub use worker::WorkerConfig;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Upper bound for any window or delay expressed in seconds (ten years).
pub const MAX_WINDOW_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Reject a seconds value that would not fit a sensible wall-clock span.
pub(crate) fn check_window(field: &str, seconds: u64) -> Result<(), ConfigError> {
    if seconds > MAX_WINDOW_SECONDS {
        return Err(ConfigError::Validation {
            field: field.to_string(),
            message: format!("must be at most {} seconds, got {}", MAX_WINDOW_SECONDS, seconds),
        });
    }
    Ok(())
}

/// Example configuration written by `relay config init`.
pub const EXAMPLE_CONFIG: &str = include_str!("../../relay.example.toml");

/// Unified configuration for the router and the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    pub routing: RoutingConfig,
    pub scoring: ScoringConfig,
    pub breaker: BreakerConfig,
    pub budget: BudgetConfig,
    pub scheduler: SchedulerConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
    /// Static worker definitions registered at startup
    pub workers: Vec<WorkerConfig>,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports RELAY_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("RELAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("RELAY_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(size) = std::env::var("RELAY_MAX_QUEUE_SIZE") {
            if let Ok(s) = size.parse() {
                self.scheduler.max_queue_size = s;
            }
        }
        if let Ok(timeout) = std::env::var("RELAY_INVOKE_TIMEOUT_MS") {
            if let Ok(t) = timeout.parse() {
                self.routing.invoke_timeout_ms = t;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.routing.validate()?;
        self.scoring.validate()?;
        self.breaker.validate()?;
        self.budget.validate()?;
        self.scheduler.validate()?;
        self.telemetry.validate()?;
        self.logging.validate()?;

        let mut seen = HashSet::new();
        for (i, worker) in self.workers.iter().enumerate() {
            if worker.id.trim().is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("workers[{}].id", i),
                    message: "id cannot be empty".to_string(),
                });
            }
            if !seen.insert(worker.id.as_str()) {
                return Err(ConfigError::Validation {
                    field: format!("workers[{}].id", i),
                    message: format!("duplicate worker id '{}'", worker.id),
                });
            }
            if worker.max_concurrent == 0 {
                return Err(ConfigError::Validation {
                    field: format!("workers[{}].max_concurrent", i),
                    message: "must be > 0".to_string(),
                });
            }
            if let Some(q) = worker.quality_score {
                if !(0.0..=1.0).contains(&q) {
                    return Err(ConfigError::Validation {
                        field: format!("workers[{}].quality_score", i),
                        message: format!("must be 0.0-1.0, got {}", q),
                    });
                }
            }
        }

        Ok(())
    }
}
