//! Agent abstraction used by the mission scheduler.
//!
//! An agent is anything that can execute a mission payload: a model behind a
//! provider, a tool runner, a remote service. Its scheduling metadata (tier,
//! pricing, capabilities) lives in the [`Catalog`](crate::catalog::Catalog) as a
//! [`Worker`](crate::catalog::Worker); this trait is only the execution side.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::AgentError;

use crate::scheduler::MissionRequest;

/// Result of a successful invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Opaque response body
    pub value: serde_json::Value,
    /// Actual USD cost incurred
    pub cost: f64,
}

impl AgentOutput {
    pub fn new(value: serde_json::Value, cost: f64) -> Self {
        Self { value, cost }
    }

    /// Reject outputs whose reported cost cannot be charged.
    pub fn checked(self) -> Result<Self, AgentError> {
        if self.cost.is_finite() && self.cost >= 0.0 {
            Ok(self)
        } else {
            Err(AgentError::InvalidResponse(format!(
                "reported cost {} is not a non-negative amount",
                self.cost
            )))
        }
    }
}

/// Execution interface for scheduler agents.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Agent>`.
///
/// # Cancellation Safety
///
/// Invocations may be raced against a timeout; implementations must tolerate
/// their future being dropped mid-flight.
#[async_trait]
pub trait Agent: Send + Sync + 'static {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Execute a mission.
    ///
    /// Default implementation returns `Unsupported`, for agents that are only
    /// placeholders in the catalog (planning targets, externally driven workers).
    async fn invoke(&self, _mission: &MissionRequest) -> Result<AgentOutput, AgentError> {
        Err(AgentError::Unsupported("invoke"))
    }
}
