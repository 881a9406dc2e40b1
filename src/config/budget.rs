//! Tenant budget configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::error::ConfigError;

/// Budget ledger configuration.
///
/// # Example
///
/// ```toml
/// [budget]
/// default_total = 100.0
/// alert_thresholds = [0.5, 0.75, 0.9]
///
/// [budget.tenants]
/// acme = 250.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Total (USD) assigned to tenants seen for the first time
    pub default_total: f64,

    /// Fractions of the total at which alerts fire, each at most once
    pub alert_thresholds: Vec<f64>,

    /// Per-tenant totals overriding `default_total`
    pub tenants: HashMap<String, f64>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            default_total: 100.0,
            alert_thresholds: vec![0.5, 0.75, 0.9],
            tenants: HashMap::new(),
        }
    }
}

impl BudgetConfig {
    /// Validate configuration at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_total.is_finite() || self.default_total < 0.0 {
            return Err(ConfigError::Validation {
                field: "budget.default_total".to_string(),
                message: "must be >= 0.0".to_string(),
            });
        }

        if let Some(bad) = self
            .alert_thresholds
            .iter()
            .find(|r| !(**r > 0.0 && **r <= 1.0))
        {
            return Err(ConfigError::Validation {
                field: "budget.alert_thresholds".to_string(),
                message: format!("thresholds must be in (0.0, 1.0], got {}", bad),
            });
        }

        if let Some((tenant, _)) = self
            .tenants
            .iter()
            .find(|(_, total)| !total.is_finite() || **total < 0.0)
        {
            return Err(ConfigError::Validation {
                field: format!("budget.tenants.{}", tenant),
                message: "must be >= 0.0".to_string(),
            });
        }

        Ok(())
    }
}
