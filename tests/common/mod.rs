//! Shared test utilities for Relay integration tests.
//!
//! Builders for workers, routers and schedulers driven by a manual clock, plus
//! a few scripted agents.

#![allow(dead_code)]

use async_trait::async_trait;
use relay::agent::{Agent, AgentError, AgentOutput};
use relay::catalog::{CostModel, Tier, Worker};
use relay::clock::ManualClock;
use relay::config::RelayConfig;
use relay::events::EventBus;
use relay::routing::Router;
use relay::scheduler::{MissionRequest, Scheduler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Worker Builders
// =============================================================================

/// Flat-priced worker with the given tier, cost and average latency.
pub fn make_worker(id: &str, tier: Tier, per_call: f64, latency_ms: u32) -> Worker {
    Worker::new(id, "test", tier, CostModel::Flat { per_call })
        .with_performance(latency_ms, latency_ms * 2)
}

/// Flat-priced agent serving the given mission domains.
pub fn make_agent(id: &str, tier: Tier, per_call: f64, domains: &[&str]) -> Worker {
    make_worker(id, tier, per_call, 500).with_capabilities(domains.iter().copied())
}

// =============================================================================
// Router / Scheduler Builders
// =============================================================================

/// Router with a manual clock and the given workers registered in order.
pub fn make_router(config: RelayConfig, workers: Vec<Worker>) -> (Router, ManualClock) {
    let clock = ManualClock::new();
    let router = Router::new(&config, Arc::new(clock.clone()), EventBus::new());
    for worker in workers {
        router.register_worker(worker).unwrap();
    }
    (router, clock)
}

/// Scheduler with a manual clock; every agent echoes its payload.
pub fn make_scheduler(config: RelayConfig, agents: Vec<Worker>) -> (Arc<Scheduler>, ManualClock) {
    let clock = ManualClock::new();
    let scheduler = Arc::new(Scheduler::new(
        &config,
        Arc::new(clock.clone()),
        EventBus::new(),
    ));
    for worker in agents {
        scheduler
            .register_agent(worker, Arc::new(EchoAgent::new(0.01)))
            .unwrap();
    }
    (scheduler, clock)
}

/// Mission in `domain` with a generous budget.
pub fn mission(id: &str, domain: &str) -> MissionRequest {
    MissionRequest::new(domain, 10.0).with_id(id)
}

// =============================================================================
// Agents
// =============================================================================

/// Returns the mission payload at a fixed cost, optionally after a delay.
pub struct EchoAgent {
    cost: f64,
    delay: Duration,
    calls: AtomicUsize,
}

impl EchoAgent {
    pub fn new(cost: f64) -> Self {
        Self {
            cost,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(cost: f64, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(cost)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for EchoAgent {
    fn name(&self) -> &str {
        "echo"
    }

    async fn invoke(&self, mission: &MissionRequest) -> Result<AgentOutput, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(AgentOutput::new(mission.payload.clone(), self.cost))
    }
}

/// Always fails.
pub struct FailingAgent;

#[async_trait]
impl Agent for FailingAgent {
    fn name(&self) -> &str {
        "failing"
    }

    async fn invoke(&self, _mission: &MissionRequest) -> Result<AgentOutput, AgentError> {
        Err(AgentError::Upstream {
            status: 503,
            message: "overloaded".to_string(),
        })
    }
}
