//! Mission requests, plans and lifecycle state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::Worker;
use crate::request::{default_tenant, Constraints, Priority};

/// A unit of work submitted to the scheduler. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionRequest {
    pub id: String,
    /// Capability an agent must expose to take the mission
    pub domain: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default = "default_tenant")]
    pub tenant: String,
    /// Spend ceiling for this mission in USD; must be positive
    pub budget: f64,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Per-invocation deadline for the agent
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl MissionRequest {
    pub fn new(domain: impl Into<String>, budget: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            domain: domain.into(),
            priority: Priority::default(),
            constraints: Constraints::default(),
            tenant: default_tenant(),
            budget,
            payload: serde_json::Value::Null,
            timeout_ms: None,
            deadline: None,
            idempotency_key: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Capabilities an agent needs: the domain plus any explicit requirements.
    pub fn required_capabilities(&self) -> Vec<String> {
        let mut capabilities = vec![self.domain.clone()];
        for c in &self.constraints.required_capabilities {
            if !capabilities.contains(c) {
                capabilities.push(c.clone());
            }
        }
        capabilities
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("mission id cannot be empty".to_string());
        }
        if self.domain.trim().is_empty() {
            return Err("domain cannot be empty".to_string());
        }
        if !self.budget.is_finite() || self.budget <= 0.0 {
            return Err(format!("budget must be > 0, got {}", self.budget));
        }
        if self.timeout_ms == Some(0) {
            return Err("timeout_ms must be > 0".to_string());
        }
        self.constraints.validate()
    }
}

/// Lifecycle state of a mission.
///
/// ```text
/// Queued --start--> Running --pause--> Paused --resume--> Running
/// Running --complete|fail--> Completed|Failed
/// Queued|Paused|Running --cancel--> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Queued,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl MissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MissionStatus::Completed | MissionStatus::Failed | MissionStatus::Cancelled
        )
    }
}

impl std::fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MissionStatus::Queued => "queued",
            MissionStatus::Running => "running",
            MissionStatus::Paused => "paused",
            MissionStatus::Completed => "completed",
            MissionStatus::Failed => "failed",
            MissionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Agents chosen for a mission at admission time.
#[derive(Debug, Clone)]
pub struct MissionPlan {
    pub mission_id: String,
    pub primary: Arc<Worker>,
    pub score: f64,
    pub estimated_cost: f64,
    pub estimated_latency_ms: u32,
    pub estimated_quality: f64,
    pub fallbacks: Vec<Arc<Worker>>,
}

impl MissionPlan {
    /// Primary followed by fallbacks.
    pub fn agents(&self) -> impl Iterator<Item = &Arc<Worker>> {
        std::iter::once(&self.primary).chain(self.fallbacks.iter())
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.agents().map(|w| w.id.clone()).collect()
    }
}

/// Point-in-time view of a mission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionSnapshot {
    pub id: String,
    pub domain: String,
    pub priority: Priority,
    pub tenant: String,
    pub status: MissionStatus,
    pub progress: u8,
    pub state: BTreeMap<String, serde_json::Value>,
    /// Cost accrued so far
    pub cost: f64,
    pub assigned_agent: Option<String>,
    pub plan: Vec<String>,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub failure: Option<String>,
}
