//! Routing request type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::TokenEstimate;
use crate::request::{default_tenant, Constraints, Priority};

/// A request to pick a worker for one task.
///
/// Immutable once handed to the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRequest {
    pub id: String,
    /// Task family (e.g. "chat", "code"); selects the domain bonus table entry
    pub domain: String,
    /// Task description; part of the response cache key
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub constraints: Constraints,
    /// Tenant whose budget pays for the request
    #[serde(default = "default_tenant")]
    pub tenant: String,
    /// Expected token volume; the router's default applies when absent
    #[serde(default)]
    pub tokens: Option<TokenEstimate>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl RoutingRequest {
    pub fn new(domain: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            domain: domain.into(),
            task: task.into(),
            priority: Priority::default(),
            constraints: Constraints::default(),
            tenant: default_tenant(),
            tokens: None,
            deadline: None,
            idempotency_key: None,
        }
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

    pub fn with_tokens(mut self, tokens: TokenEstimate) -> Self {
        self.tokens = Some(tokens);
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

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.domain.trim().is_empty() {
            return Err("domain cannot be empty".to_string());
        }
        if self.tenant.trim().is_empty() {
            return Err("tenant cannot be empty".to_string());
        }
        if let Some(tokens) = self.tokens {
            if tokens.input == 0 && tokens.output == 0 {
                return Err("token estimate cannot be zero".to_string());
            }
        }
        self.constraints.validate()
    }
}
