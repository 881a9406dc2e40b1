//! Error types for agent invocations.

use thiserror::Error;

/// Errors an agent or model worker can report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// Network connectivity error (DNS, connection refused, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Invocation exceeded its deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Backend returned an error response (4xx, 5xx).
    #[error("Backend error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Backend is throttling this caller.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Method not supported by this agent implementation.
    #[error("Method '{0}' not supported by this agent")]
    Unsupported(&'static str),

    /// Backend response doesn't match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The agent ran but could not accomplish the task.
    #[error("Agent failed: {0}")]
    Failed(String),
}
