//! Request vocabulary shared by the router and the scheduler.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Urgency of a request or mission.
///
/// Ordering follows urgency: `Low < Normal < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

/// Tenant charged when a request names none.
pub(crate) fn default_tenant() -> String {
    "default".to_string()
}

/// Hard limits a caller places on the worker chosen for a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    /// Maximum estimated cost in USD
    pub max_cost: Option<f64>,
    /// Maximum p95 latency in milliseconds
    pub max_latency_ms: Option<u32>,
    /// Minimum quality score (0.0-1.0)
    pub min_quality: Option<f64>,
    /// Capabilities the worker must expose
    pub required_capabilities: Vec<String>,
}

impl Constraints {
    /// Reject negative or out-of-range limits.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max_cost) = self.max_cost {
            if !max_cost.is_finite() || max_cost < 0.0 {
                return Err(format!("max_cost must be >= 0, got {}", max_cost));
            }
        }
        if let Some(min_quality) = self.min_quality {
            if !(0.0..=1.0).contains(&min_quality) {
                return Err(format!("min_quality must be 0.0-1.0, got {}", min_quality));
            }
        }
        if self.required_capabilities.iter().any(|c| c.trim().is_empty()) {
            return Err("required capabilities cannot be empty strings".to_string());
        }
        Ok(())
    }
}
