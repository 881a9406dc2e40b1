//! Router configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::catalog::TokenEstimate;
use crate::config::check_window;
use crate::config::error::ConfigError;

/// Router behaviour: timeouts, caching, fallback depth.
///
/// # Example
///
/// ```toml
/// [routing]
/// invoke_timeout_ms = 60000
/// cache_ttl_seconds = 3600
/// max_fallbacks = 3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Deadline for a single worker invocation; expiry counts as a failure.
    pub invoke_timeout_ms: u64,
    /// Default lifetime of cached responses.
    pub cache_ttl_seconds: u64,
    /// Number of next-ranked workers packaged as fallbacks.
    pub max_fallbacks: usize,
    /// Token volume assumed when a request does not provide one.
    pub default_input_tokens: u32,
    pub default_output_tokens: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            invoke_timeout_ms: 60_000,
            cache_ttl_seconds: 3600,
            max_fallbacks: 3,
            default_input_tokens: 500,
            default_output_tokens: 250,
        }
    }
}

impl RoutingConfig {
    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_millis(self.invoke_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn default_tokens(&self) -> TokenEstimate {
        TokenEstimate::new(self.default_input_tokens, self.default_output_tokens)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.invoke_timeout_ms == 0 {
            return Err(ConfigError::Validation {
                field: "routing.invoke_timeout_ms".to_string(),
                message: "timeout must be non-zero".to_string(),
            });
        }
        check_window("routing.cache_ttl_seconds", self.cache_ttl_seconds)
    }
}
