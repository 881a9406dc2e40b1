//! Relay - cost-aware LLM worker routing and priority mission scheduling
//!
//! The [`routing::Router`] picks a worker for each request by score within
//! the tenant's remaining budget, then executes through a sequential fallback
//! chain guarded by per-worker circuit breakers. The
//! [`scheduler::Scheduler`] admits long-running missions into a bounded
//! priority queue and drives them through their lifecycle on registered
//! agents.

pub mod agent;
pub mod breaker;
pub mod budget;
pub mod catalog;
pub mod cli;
pub mod clock;
pub mod config;
pub mod events;
pub mod fallback;
pub mod logging;
pub mod request;
pub mod routing;
pub mod scheduler;
pub mod telemetry;
