//! Scoring weights and domain bonus tables
//!
//! The weights are heuristics. They are exposed as configuration so operators
//! can tune them without touching the scoring formula.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::error::ConfigError;

/// How a domain biases worker selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainProfile {
    /// Reward workers whose average latency is under the threshold
    LatencySensitive,
    /// Reward the quality tier
    QualitySensitive,
    #[default]
    Neutral,
}

/// Base score per tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierBase {
    pub fast: f64,
    pub balanced: f64,
    pub quality: f64,
}

impl Default for TierBase {
    fn default() -> Self {
        Self {
            fast: 60.0,
            balanced: 80.0,
            quality: 100.0,
        }
    }
}

/// Bonus granted when request priority matches a tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityBonus {
    /// Critical requests on quality-tier workers
    pub critical_quality: f64,
    /// High-priority requests on quality-tier workers
    pub high_quality: f64,
    /// Low-priority requests on fast-tier workers
    pub low_fast: f64,
}

impl Default for PriorityBonus {
    fn default() -> Self {
        Self {
            critical_quality: 20.0,
            high_quality: 10.0,
            low_fast: 15.0,
        }
    }
}

/// Bonus amounts applied by domain profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainBonus {
    /// Average latency under which latency-sensitive domains grant a bonus
    pub latency_threshold_ms: u32,
    pub latency_bonus: f64,
    pub quality_bonus: f64,
}

impl Default for DomainBonus {
    fn default() -> Self {
        Self {
            latency_threshold_ms: 1000,
            latency_bonus: 15.0,
            quality_bonus: 15.0,
        }
    }
}

/// Scoring configuration shared by the router and the scheduler.
///
/// Only the domain tables differ between the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub tier_base: TierBase,
    /// Points subtracted per USD of estimated cost
    pub cost_weight: f64,
    /// Average latency (ms) is divided by this before being subtracted
    pub latency_divisor: f64,
    pub priority_bonus: PriorityBonus,
    pub domain_bonus: DomainBonus,
    /// Domain table used when routing model requests
    pub router_domains: HashMap<String, DomainProfile>,
    /// Domain table used when placing missions on agents
    pub scheduler_domains: HashMap<String, DomainProfile>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let router_domains = HashMap::from([
            ("chat".to_string(), DomainProfile::LatencySensitive),
            ("autocomplete".to_string(), DomainProfile::LatencySensitive),
            ("code".to_string(), DomainProfile::QualitySensitive),
            ("analysis".to_string(), DomainProfile::QualitySensitive),
        ]);
        let scheduler_domains = HashMap::from([
            ("triage".to_string(), DomainProfile::LatencySensitive),
            ("monitoring".to_string(), DomainProfile::LatencySensitive),
            ("research".to_string(), DomainProfile::QualitySensitive),
            ("review".to_string(), DomainProfile::QualitySensitive),
        ]);
        Self {
            tier_base: TierBase::default(),
            cost_weight: 10.0,
            latency_divisor: 100.0,
            priority_bonus: PriorityBonus::default(),
            domain_bonus: DomainBonus::default(),
            router_domains,
            scheduler_domains,
        }
    }
}

impl ScoringConfig {
    /// Profile for a request domain; unknown domains are neutral.
    pub fn router_profile(&self, domain: &str) -> DomainProfile {
        self.router_domains.get(domain).copied().unwrap_or_default()
    }

    /// Profile for a mission domain; unknown domains are neutral.
    pub fn scheduler_profile(&self, domain: &str) -> DomainProfile {
        self.scheduler_domains.get(domain).copied().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.latency_divisor > 0.0) {
            return Err(ConfigError::Validation {
                field: "scoring.latency_divisor".to_string(),
                message: "must be > 0".to_string(),
            });
        }
        if !(self.cost_weight >= 0.0) {
            return Err(ConfigError::Validation {
                field: "scoring.cost_weight".to_string(),
                message: "must be >= 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_defaults_match_documented_formula() {
        let config = ScoringConfig::default();
        assert_eq!(config.tier_base.quality, 100.0);
        assert_eq!(config.tier_base.balanced, 80.0);
        assert_eq!(config.tier_base.fast, 60.0);
        assert_eq!(config.cost_weight, 10.0);
        assert_eq!(config.latency_divisor, 100.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_domain_profile_serde() {
        let toml = r#"
        [router_domains]
        search = "latency_sensitive"
        "#;
        let config: ScoringConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.router_domains.get("search"),
            Some(&DomainProfile::LatencySensitive)
        );
        // Providing a table replaces the default one.
        assert!(!config.router_domains.contains_key("chat"));
    }

    #[test]
    fn test_zero_latency_divisor_rejected() {
        let config = ScoringConfig {
            latency_divisor: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
