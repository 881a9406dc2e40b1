//! Scheduler error types

use thiserror::Error;

use crate::agent::AgentError;
use crate::fallback::Attempt;
use crate::scheduler::MissionStatus;

/// Errors returned by mission admission, lifecycle and execution calls.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Malformed request or argument
    #[error("Invalid mission: {0}")]
    Validation(String),

    /// Backpressure: the queue is at capacity, retry later
    #[error("Mission queue full ({max_queue_size} queued)")]
    QueueFull { max_queue_size: usize },

    /// No registered agent serves the domain with spare capacity
    #[error("No candidate agent for domain '{domain}'")]
    NoCandidateAgent { domain: String },

    /// The best available agent still violates the mission's requirements
    #[error("Mission requirements cannot be met: {}", .violations.join("; "))]
    RequirementsUnmet { violations: Vec<String> },

    #[error("Mission '{0}' not found")]
    MissionNotFound(String),

    #[error("Agent '{0}' not found")]
    AgentNotFound(String),

    #[error("Agent '{agent_id}' does not support invoke")]
    AgentDoesNotSupportInvoke { agent_id: String },

    #[error("Agent '{agent_id}' timed out after {timeout_ms}ms on mission '{mission_id}'")]
    AgentTimeout {
        mission_id: String,
        agent_id: String,
        timeout_ms: u64,
    },

    /// Lifecycle operation not allowed from the mission's current state
    #[error("Cannot {operation} mission '{mission_id}' while {from}")]
    InvalidTransition {
        mission_id: String,
        from: MissionStatus,
        operation: &'static str,
    },

    /// Every agent in the plan was skipped or failed
    #[error("All agents exhausted for mission '{mission_id}' after {} attempts", .attempts.len())]
    AllAgentsExhausted {
        mission_id: String,
        attempts: Vec<Attempt>,
        last_error: Option<AgentError>,
    },

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl SchedulerError {
    /// True when the same call may succeed later without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SchedulerError::QueueFull { .. }
                | SchedulerError::AgentTimeout { .. }
                | SchedulerError::AllAgentsExhausted { .. }
        )
    }
}
