//! Sequential fallback execution.
//!
//! ```text
//! primary fails / breaker open / at capacity
//!         |
//!         v
//! fallback 1 (breaker consulted fresh)
//!         |
//!         v
//! fallback 2 ... until one succeeds or the chain is exhausted
//! ```
//!
//! Attempts never overlap: the next worker is only tried once the previous
//! attempt has succeeded, failed, or timed out. The router and the scheduler
//! both execute through [`FallbackRunner`].

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agent::{AgentError, AgentOutput};
use crate::breaker::CircuitBreakerBank;
use crate::catalog::{Catalog, LoadGuard, Worker};
use crate::telemetry::MetricsLog;

/// What happened to one hop of the chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded { latency_ms: u32 },
    Failed { latency_ms: u32, error: String },
    TimedOut { after_ms: u64 },
    /// Breaker refused the attempt
    SkippedCircuitOpen,
    /// Worker was at max concurrency or no longer registered
    SkippedUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub worker_id: String,
    pub outcome: AttemptOutcome,
}

/// The first successful hop.
#[derive(Debug, Clone)]
pub struct FallbackSuccess {
    pub worker: Arc<Worker>,
    pub output: AgentOutput,
    pub latency_ms: u32,
    /// Every hop including the successful one
    pub attempts: Vec<Attempt>,
}

/// Every hop was skipped or failed.
#[derive(Debug, Clone)]
pub struct FallbackExhausted {
    pub attempts: Vec<Attempt>,
    /// Last invocation error, `None` when nothing was actually invoked
    pub last_error: Option<AgentError>,
}

/// Runs a worker chain against shared breaker, capacity and telemetry state.
pub struct FallbackRunner<'a> {
    catalog: &'a Catalog,
    breakers: &'a CircuitBreakerBank,
    telemetry: &'a MetricsLog,
    timeout: Duration,
}

impl<'a> FallbackRunner<'a> {
    pub fn new(
        catalog: &'a Catalog,
        breakers: &'a CircuitBreakerBank,
        telemetry: &'a MetricsLog,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            breakers,
            telemetry,
            timeout,
        }
    }

    /// Try each worker in order until one succeeds.
    ///
    /// `reserved` is capacity the caller already holds; it is used in place of
    /// a fresh reservation when its worker comes up in the chain.
    pub async fn run<F, Fut>(
        &self,
        chain: &[Arc<Worker>],
        mut reserved: Option<LoadGuard>,
        mut invoke: F,
    ) -> Result<FallbackSuccess, FallbackExhausted>
    where
        F: FnMut(Arc<Worker>) -> Fut,
        Fut: Future<Output = Result<AgentOutput, AgentError>>,
    {
        let mut attempts = Vec::with_capacity(chain.len());
        let mut last_error = None;

        for worker in chain {
            let id = worker.id.as_str();

            let held = reserved.take_if(|guard| guard.worker().id == worker.id);
            let Some(_guard) = held.or_else(|| self.catalog.acquire(id)) else {
                tracing::debug!(worker_id = id, "Skipping worker at capacity");
                attempts.push(Attempt {
                    worker_id: worker.id.clone(),
                    outcome: AttemptOutcome::SkippedUnavailable,
                });
                continue;
            };

            if !self.breakers.can_attempt(id) {
                tracing::debug!(worker_id = id, "Skipping worker with open circuit");
                attempts.push(Attempt {
                    worker_id: worker.id.clone(),
                    outcome: AttemptOutcome::SkippedCircuitOpen,
                });
                continue;
            }

            let started = Instant::now();
            let result = tokio::time::timeout(self.timeout, invoke(Arc::clone(worker)))
                .await
                .map(|r| r.and_then(AgentOutput::checked));
            let latency_ms = u32::try_from(started.elapsed().as_millis()).unwrap_or(u32::MAX);

            match result {
                Ok(Ok(output)) => {
                    self.breakers.record_success(id);
                    self.catalog.record_latency(id, latency_ms);
                    self.telemetry.record_success(id, latency_ms, output.cost);
                    attempts.push(Attempt {
                        worker_id: worker.id.clone(),
                        outcome: AttemptOutcome::Succeeded { latency_ms },
                    });
                    return Ok(FallbackSuccess {
                        worker: Arc::clone(worker),
                        output,
                        latency_ms,
                        attempts,
                    });
                }
                Ok(Err(error)) => {
                    tracing::warn!(worker_id = id, latency_ms, error = %error, "Worker attempt failed");
                    self.breakers.record_failure(id);
                    self.telemetry.record_failure(id, latency_ms, error.to_string());
                    attempts.push(Attempt {
                        worker_id: worker.id.clone(),
                        outcome: AttemptOutcome::Failed {
                            latency_ms,
                            error: error.to_string(),
                        },
                    });
                    last_error = Some(error);
                }
                Err(_) => {
                    let after_ms = self.timeout.as_millis() as u64;
                    let error = AgentError::Timeout(after_ms);
                    tracing::warn!(worker_id = id, after_ms, "Worker attempt timed out");
                    self.breakers.record_failure(id);
                    self.telemetry.record_failure(id, latency_ms, error.to_string());
                    attempts.push(Attempt {
                        worker_id: worker.id.clone(),
                        outcome: AttemptOutcome::TimedOut { after_ms },
                    });
                    last_error = Some(error);
                }
            }
        }

        Err(FallbackExhausted {
            attempts,
            last_error,
        })
    }
}
