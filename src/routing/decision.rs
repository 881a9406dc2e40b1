//! Routing decisions and execution results

use serde::Serialize;
use std::sync::Arc;

use crate::agent::AgentOutput;
use crate::catalog::Worker;
use crate::fallback::Attempt;

/// Where a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Fresh candidate search and scoring
    Scored,
    /// Served from the response cache
    Cache,
}

/// The worker chosen for a request plus its fallbacks.
#[derive(Debug, Clone)]
pub struct Decision {
    pub request_id: String,
    pub tenant: String,
    pub primary: Arc<Worker>,
    pub score: f64,
    pub estimated_cost: f64,
    pub estimated_latency_ms: u32,
    pub estimated_quality: f64,
    /// Next-ranked candidates, tried in order if the primary fails
    pub fallbacks: Vec<Arc<Worker>>,
    pub source: DecisionSource,
    /// Thresholds the estimated cost would cross (already alerted)
    pub projected_alerts: Vec<f64>,
    /// Response to replay for cache decisions
    pub cached: Option<ExecutionResult>,
}

impl Decision {
    pub fn is_cached(&self) -> bool {
        self.source == DecisionSource::Cache
    }

    /// Primary followed by fallbacks.
    pub fn chain(&self) -> Vec<Arc<Worker>> {
        std::iter::once(Arc::clone(&self.primary))
            .chain(self.fallbacks.iter().cloned())
            .collect()
    }

    pub fn view(&self) -> DecisionView {
        DecisionView {
            request_id: self.request_id.clone(),
            tenant: self.tenant.clone(),
            primary: self.primary.id.clone(),
            score: self.score,
            estimated_cost: self.estimated_cost,
            estimated_latency_ms: self.estimated_latency_ms,
            estimated_quality: self.estimated_quality,
            fallbacks: self.fallbacks.iter().map(|w| w.id.clone()).collect(),
            source: self.source,
            projected_alerts: self.projected_alerts.clone(),
        }
    }
}

/// Serializable summary of a [`Decision`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionView {
    pub request_id: String,
    pub tenant: String,
    pub primary: String,
    pub score: f64,
    pub estimated_cost: f64,
    pub estimated_latency_ms: u32,
    pub estimated_quality: f64,
    pub fallbacks: Vec<String>,
    pub source: DecisionSource,
    pub projected_alerts: Vec<f64>,
}

/// Outcome of executing a decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// Worker that produced the output
    pub worker_id: String,
    pub output: AgentOutput,
    pub latency_ms: u32,
    pub attempts: Vec<Attempt>,
    pub from_cache: bool,
}
