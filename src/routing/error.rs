//! Error types for routing failures

use thiserror::Error;

use crate::agent::AgentError;
use crate::budget::BudgetError;
use crate::fallback::Attempt;

/// Errors that can occur while routing or executing a request
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Malformed request
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Tenant has nothing left to spend
    #[error("Budget exhausted for tenant '{tenant}'")]
    BudgetExhausted { tenant: String },

    /// Candidates exist but none is affordable
    #[error(
        "Budget insufficient for tenant '{tenant}': cheapest candidate costs {required:.4}, \
         remaining {remaining:.4} (short {shortfall:.4})"
    )]
    BudgetInsufficient {
        tenant: String,
        required: f64,
        remaining: f64,
        shortfall: f64,
    },

    /// No registered worker satisfies the constraints, or all are tripped
    #[error("No available model for domain '{domain}'")]
    NoAvailableModel { domain: String },

    /// Every worker in the chain was skipped or failed
    #[error(
        "All providers exhausted after {} attempts (last error: {})",
        .attempts.len(),
        describe_last(.last_error)
    )]
    AllProvidersExhausted {
        attempts: Vec<Attempt>,
        last_error: Option<AgentError>,
    },

    #[error(transparent)]
    Budget(#[from] BudgetError),
}

fn describe_last(last_error: &Option<AgentError>) -> String {
    last_error
        .as_ref()
        .map_or_else(|| "none invoked".to_string(), ToString::to_string)
}

impl RoutingError {
    /// True when the same request may succeed later without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RoutingError::BudgetExhausted { .. }
                | RoutingError::BudgetInsufficient { .. }
                | RoutingError::AllProvidersExhausted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(RoutingError::BudgetExhausted {
            tenant: "t".into()
        }
        .is_retryable());
        assert!(!RoutingError::Validation("bad".into()).is_retryable());
        assert!(!RoutingError::NoAvailableModel {
            domain: "chat".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_exhausted_message_includes_last_error() {
        let err = RoutingError::AllProvidersExhausted {
            attempts: vec![],
            last_error: Some(AgentError::Timeout(60000)),
        };
        assert_eq!(
            err.to_string(),
            "All providers exhausted after 0 attempts (last error: Request timeout after 60000ms)"
        );
    }
}
