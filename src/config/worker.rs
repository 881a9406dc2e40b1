//! Static worker definitions

use serde::{Deserialize, Serialize};

use crate::catalog::{CostModel, Tier, Worker};

/// A worker declared in the config file.
///
/// # Example
///
/// ```toml
/// [[workers]]
/// id = "claude-sonnet"
/// provider = "anthropic"
/// tier = "quality"
/// capabilities = ["chat", "code"]
/// cost = { kind = "per_token", input_per_1k = 0.003, output_per_1k = 0.015 }
/// avg_latency_ms = 1800
/// p95_latency_ms = 4000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub provider: String,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub cost: CostModel,
    #[serde(default = "default_avg_latency")]
    pub avg_latency_ms: u32,
    #[serde(default = "default_p95_latency")]
    pub p95_latency_ms: u32,
    /// Falls back to a per-tier default when omitted
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
}

fn default_avg_latency() -> u32 {
    1000
}

fn default_p95_latency() -> u32 {
    2000
}

fn default_max_concurrent() -> u32 {
    4
}

impl WorkerConfig {
    /// Build the catalog entry. Validation happens at registration.
    pub fn to_worker(&self) -> Worker {
        let mut worker = Worker::new(&self.id, &self.provider, self.tier, self.cost)
            .with_capabilities(self.capabilities.iter().cloned())
            .with_performance(self.avg_latency_ms, self.p95_latency_ms)
            .with_max_concurrent(self.max_concurrent);
        if let Some(name) = &self.name {
            worker = worker.with_name(name);
        }
        if let Some(quality) = self.quality_score {
            worker = worker.with_quality(quality);
        }
        worker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_minimal() {
        let toml = r#"
        id = "local-llama"
        provider = "ollama"
        cost = { kind = "flat", per_call = 0.0 }
        "#;
        let config: WorkerConfig = toml::from_str(toml).unwrap();
        let worker = config.to_worker();
        assert_eq!(worker.id, "local-llama");
        assert_eq!(worker.name, "local-llama");
        assert_eq!(worker.tier, Tier::Balanced);
        assert_eq!(worker.max_concurrent, 4);
        assert_eq!(worker.performance.p95_latency_ms, 2000);
    }

    #[test]
    fn test_worker_config_full() {
        let toml = r#"
        id = "sonnet"
        name = "Claude Sonnet"
        provider = "anthropic"
        tier = "quality"
        capabilities = ["chat", "code"]
        cost = { kind = "per_token", input_per_1k = 0.003, output_per_1k = 0.015 }
        avg_latency_ms = 1800
        p95_latency_ms = 4000
        quality_score = 0.97
        max_concurrent = 8
        "#;
        let config: WorkerConfig = toml::from_str(toml).unwrap();
        let worker = config.to_worker();
        assert_eq!(worker.name, "Claude Sonnet");
        assert_eq!(worker.tier, Tier::Quality);
        assert!(worker.supports("code"));
        assert_eq!(worker.avg_latency_ms(), 1800);
        assert_eq!(worker.quality_score, 0.97);
        assert_eq!(worker.max_concurrent, 8);
    }

    #[test]
    fn test_worker_config_unknown_tier_rejected() {
        let toml = r#"
        id = "x"
        provider = "y"
        tier = "premium"
        cost = { kind = "flat", per_call = 0.1 }
        "#;
        assert!(toml::from_str::<WorkerConfig>(toml).is_err());
    }
}
