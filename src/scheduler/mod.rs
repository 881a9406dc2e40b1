//! Priority mission scheduler
//!
//! Admits missions under a bounded queue, plans them onto agents with the same
//! scoring as the router, and drives each through its lifecycle:
//!
//! ```text
//! submit ──> Queued ──start──> Running ──complete/fail──> Completed | Failed
//!                                 │  ▲
//!                            pause│  │resume
//!                                 ▼  │
//!                                Paused
//! cancel: Queued | Paused | Running ──> Cancelled
//! ```
//!
//! All mutable state sits behind one mutex that is never held across an
//! `.await`. Agent invocations run outside the lock; a result arriving for a
//! mission that is no longer running is discarded.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod error;
mod metrics;
mod mission;
mod queue;

pub use error::SchedulerError;
pub use metrics::QueueMetrics;
pub use mission::{MissionPlan, MissionRequest, MissionSnapshot, MissionStatus};

use crate::agent::{Agent, AgentError, AgentOutput};
use crate::breaker::CircuitBreakerBank;
use crate::budget::BudgetLedger;
use crate::catalog::{Catalog, CatalogError, LoadGuard, TokenEstimate, Worker};
use crate::clock::{self, SharedClock};
use crate::config::{RelayConfig, SchedulerConfig, ScoringConfig};
use crate::events::{EventBus, RelayEvent};
use crate::fallback::FallbackRunner;
use crate::routing::scoring::{rank, ScoreContext, Scored};
use crate::telemetry::MetricsLog;
use queue::{MissionQueue, QueueEntry};

/// Result of [`Scheduler::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The mission completed with this agent's output
    Completed { agent_id: String, output: AgentOutput },
    /// The mission left `Running` while the agent worked; the result was dropped
    Discarded { status: MissionStatus },
}

struct Mission {
    request: Arc<MissionRequest>,
    plan: MissionPlan,
    status: MissionStatus,
    progress: u8,
    state: BTreeMap<String, serde_json::Value>,
    cost: f64,
    agent: Option<String>,
    lease: Option<LoadGuard>,
    in_flight: bool,
    enqueued_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    result: Option<serde_json::Value>,
    failure: Option<String>,
}

impl Mission {
    fn snapshot(&self) -> MissionSnapshot {
        MissionSnapshot {
            id: self.request.id.clone(),
            domain: self.request.domain.clone(),
            priority: self.request.priority,
            tenant: self.request.tenant.clone(),
            status: self.status,
            progress: self.progress,
            state: self.state.clone(),
            cost: self.cost,
            assigned_agent: self.agent.clone(),
            plan: self.plan.agent_ids(),
            enqueued_at: self.enqueued_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            result: self.result.clone(),
            failure: self.failure.clone(),
        }
    }

    fn require(
        &self,
        allowed: &[MissionStatus],
        operation: &'static str,
    ) -> Result<(), SchedulerError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(SchedulerError::InvalidTransition {
                mission_id: self.request.id.clone(),
                from: self.status,
                operation,
            })
        }
    }

    /// Move to `to`, returning the event to publish once the lock is released.
    fn transition(&mut self, to: MissionStatus) -> RelayEvent {
        let from = self.status;
        self.status = to;
        if to != MissionStatus::Running {
            self.lease = None;
        }
        if to == MissionStatus::Paused {
            self.agent = None;
        }
        RelayEvent::MissionStatusChanged {
            mission_id: self.request.id.clone(),
            from,
            to,
        }
    }
}

#[derive(Default)]
struct SchedulerState {
    missions: HashMap<String, Mission>,
    queue: MissionQueue,
    idempotency: HashMap<String, String>,
    completions: VecDeque<DateTime<Utc>>,
    next_seq: u64,
    accepted: u64,
    rejected: u64,
    completed: u64,
    failed: u64,
    cancelled: u64,
}

impl SchedulerState {
    fn mission(&self, id: &str) -> Result<&Mission, SchedulerError> {
        self.missions
            .get(id)
            .ok_or_else(|| SchedulerError::MissionNotFound(id.to_string()))
    }

    fn mission_mut(&mut self, id: &str) -> Result<&mut Mission, SchedulerError> {
        self.missions
            .get_mut(id)
            .ok_or_else(|| SchedulerError::MissionNotFound(id.to_string()))
    }
}

/// Admits, orders and runs missions on registered agents.
pub struct Scheduler {
    state: Mutex<SchedulerState>,
    catalog: Catalog,
    agents: DashMap<String, Arc<dyn Agent>>,
    breakers: CircuitBreakerBank,
    ledger: Arc<BudgetLedger>,
    telemetry: MetricsLog,
    config: SchedulerConfig,
    scoring: ScoringConfig,
    tokens: TokenEstimate,
    max_fallbacks: usize,
    invoke_timeout: Duration,
    clock: SharedClock,
    events: EventBus,
}

impl Scheduler {
    pub fn new(config: &RelayConfig, clock: SharedClock, events: EventBus) -> Self {
        let ledger = Arc::new(BudgetLedger::new(
            config.budget.clone(),
            clock.clone(),
            events.clone(),
        ));
        Self::with_ledger(config, ledger, clock, events)
    }

    /// Create a scheduler that charges mission costs to an existing ledger,
    /// typically the router's.
    pub fn with_ledger(
        config: &RelayConfig,
        ledger: Arc<BudgetLedger>,
        clock: SharedClock,
        events: EventBus,
    ) -> Self {
        Self {
            state: Mutex::new(SchedulerState::default()),
            catalog: Catalog::new(),
            agents: DashMap::new(),
            breakers: CircuitBreakerBank::new(config.breaker.clone(), clock.clone(), events.clone()),
            ledger,
            telemetry: MetricsLog::new(config.telemetry.clone(), clock.clone()),
            config: config.scheduler.clone(),
            scoring: config.scoring.clone(),
            tokens: config.routing.default_tokens(),
            max_fallbacks: config.routing.max_fallbacks,
            invoke_timeout: config.routing.invoke_timeout(),
            clock,
            events,
        }
    }

    /// Register an agent's catalog entry together with its implementation.
    pub fn register_agent(
        &self,
        worker: Worker,
        agent: Arc<dyn Agent>,
    ) -> Result<Arc<Worker>, CatalogError> {
        let worker = self.catalog.register(worker)?;
        self.breakers.register(&worker.id);
        tracing::info!(agent_id = %worker.id, name = agent.name(), "Registered agent");
        self.agents.insert(worker.id.clone(), agent);
        Ok(worker)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn breakers(&self) -> &CircuitBreakerBank {
        &self.breakers
    }

    pub fn ledger(&self) -> &Arc<BudgetLedger> {
        &self.ledger
    }

    fn reject(
        &self,
        state: &mut SchedulerState,
        reason: &'static str,
        error: SchedulerError,
    ) -> SchedulerError {
        state.rejected += 1;
        ::metrics::counter!("relay_missions_rejected_total", "reason" => reason).increment(1);
        tracing::warn!(reason, error = %error, "Mission rejected");
        error
    }

    /// Admit a mission and return its plan.
    ///
    /// A previously admitted idempotency key returns the stored plan without
    /// re-admitting. Every rejection counts toward the rejection rate.
    pub fn submit(&self, request: MissionRequest) -> Result<MissionPlan, SchedulerError> {
        let mut state = self.state.lock();

        if let Some(key) = &request.idempotency_key {
            if let Some(mission_id) = state.idempotency.get(key) {
                let plan = state.mission(mission_id)?.plan.clone();
                tracing::debug!(mission_id = %plan.mission_id, key = %key, "Idempotent replay");
                return Ok(plan);
            }
        }

        if let Err(message) = request.validate() {
            return Err(self.reject(&mut state, "validation", SchedulerError::Validation(message)));
        }
        if state.missions.contains_key(&request.id) {
            let message = format!("mission id '{}' already exists", request.id);
            return Err(self.reject(&mut state, "validation", SchedulerError::Validation(message)));
        }

        if state.queue.len() >= self.config.max_queue_size {
            let error = SchedulerError::QueueFull {
                max_queue_size: self.config.max_queue_size,
            };
            return Err(self.reject(&mut state, "queue_full", error));
        }

        let candidates: Vec<_> = self
            .catalog
            .list_available(&request.required_capabilities())
            .into_iter()
            .filter(|w| self.breakers.is_available(&w.id))
            .collect();
        if candidates.is_empty() {
            let error = SchedulerError::NoCandidateAgent {
                domain: request.domain.clone(),
            };
            return Err(self.reject(&mut state, "no_candidate", error));
        }

        let ctx = ScoreContext {
            priority: request.priority,
            profile: self.scoring.scheduler_profile(&request.domain),
            tokens: self.tokens,
        };
        let ranked = rank(candidates, &ctx, &self.scoring);
        let Some(index) = ranked.iter().position(|s| violations(s, &request).is_empty()) else {
            let error = SchedulerError::RequirementsUnmet {
                violations: violations(&ranked[0], &request),
            };
            return Err(self.reject(&mut state, "requirements_unmet", error));
        };

        let chosen = &ranked[index];
        let plan = MissionPlan {
            mission_id: request.id.clone(),
            primary: Arc::clone(&chosen.worker),
            score: chosen.score,
            estimated_cost: chosen.estimated_cost,
            estimated_latency_ms: chosen.worker.avg_latency_ms(),
            estimated_quality: chosen.worker.quality_score,
            fallbacks: ranked[index + 1..]
                .iter()
                .filter(|s| violations(s, &request).is_empty())
                .take(self.max_fallbacks)
                .map(|s| Arc::clone(&s.worker))
                .collect(),
        };

        let now = self.clock.now();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.insert(QueueEntry {
            mission_id: request.id.clone(),
            priority: request.priority,
            deadline: request.deadline,
            seq,
            pinned: false,
        });
        if let Some(key) = &request.idempotency_key {
            state.idempotency.insert(key.clone(), request.id.clone());
        }
        state.accepted += 1;

        tracing::info!(
            mission_id = %request.id,
            domain = %request.domain,
            priority = %request.priority,
            agent_id = %plan.primary.id,
            queue_length = state.queue.len(),
            "Mission admitted"
        );
        ::metrics::counter!("relay_missions_accepted_total").increment(1);
        ::metrics::gauge!("relay_queue_length").set(state.queue.len() as f64);

        state.missions.insert(
            request.id.clone(),
            Mission {
                request: Arc::new(request),
                plan: plan.clone(),
                status: MissionStatus::Queued,
                progress: 0,
                state: BTreeMap::new(),
                cost: 0.0,
                agent: None,
                lease: None,
                in_flight: false,
                enqueued_at: now,
                started_at: None,
                completed_at: None,
                result: None,
                failure: None,
            },
        );

        Ok(plan)
    }

    /// Start a queued mission on the first plan agent with capacity and a
    /// closed breaker. Returns the assigned agent id.
    pub fn start(&self, mission_id: &str) -> Result<String, SchedulerError> {
        let (agent_id, event) = {
            let mut state = self.state.lock();
            state.mission(mission_id)?.require(&[MissionStatus::Queued], "start")?;
            self.start_locked(&mut state, mission_id)?
        };
        self.events.publish(event);
        Ok(agent_id)
    }

    fn start_locked(
        &self,
        state: &mut SchedulerState,
        mission_id: &str,
    ) -> Result<(String, RelayEvent), SchedulerError> {
        let now = self.clock.now();
        let mission = state.mission_mut(mission_id)?;
        let lease = mission
            .plan
            .agents()
            .filter(|w| self.breakers.is_available(&w.id))
            .find_map(|w| self.catalog.acquire(&w.id))
            .ok_or_else(|| SchedulerError::NoCandidateAgent {
                domain: mission.request.domain.clone(),
            })?;

        let agent_id = lease.worker().id.clone();
        mission.agent = Some(agent_id.clone());
        mission.lease = Some(lease);
        mission.started_at.get_or_insert(now);
        let event = mission.transition(MissionStatus::Running);
        state.queue.remove(mission_id);

        tracing::info!(mission_id, agent_id = %agent_id, "Mission started");
        ::metrics::gauge!("relay_queue_length").set(state.queue.len() as f64);
        Ok((agent_id, event))
    }

    /// Pause a running mission. It re-enters the queue ahead of unpinned
    /// missions and its agent is released.
    pub fn pause(&self, mission_id: &str) -> Result<(), SchedulerError> {
        let event = {
            let mut state = self.state.lock();
            let mission = state.mission_mut(mission_id)?;
            mission.require(&[MissionStatus::Running], "pause")?;
            let event = mission.transition(MissionStatus::Paused);
            let request = Arc::clone(&mission.request);
            let seq = state.next_seq;
            state.next_seq += 1;
            state.queue.insert(QueueEntry {
                mission_id: mission_id.to_string(),
                priority: request.priority,
                deadline: request.deadline,
                seq,
                pinned: true,
            });
            event
        };
        tracing::info!(mission_id, "Mission paused");
        self.events.publish(event);
        Ok(())
    }

    /// Resume a paused mission, reassigning an agent.
    pub fn resume(&self, mission_id: &str) -> Result<String, SchedulerError> {
        let (agent_id, event) = {
            let mut state = self.state.lock();
            state.mission(mission_id)?.require(&[MissionStatus::Paused], "resume")?;
            self.start_locked(&mut state, mission_id)?
        };
        self.events.publish(event);
        Ok(agent_id)
    }

    /// Set progress (0-100) on a running mission.
    pub fn update_progress(&self, mission_id: &str, progress: u8) -> Result<(), SchedulerError> {
        if progress > 100 {
            return Err(SchedulerError::Validation(format!(
                "progress must be 0-100, got {}",
                progress
            )));
        }
        {
            let mut state = self.state.lock();
            let mission = state.mission_mut(mission_id)?;
            mission.require(&[MissionStatus::Running], "update progress of")?;
            mission.progress = progress;
        }
        self.events.publish(RelayEvent::MissionProgress {
            mission_id: mission_id.to_string(),
            progress,
        });
        Ok(())
    }

    /// Set a key in a running mission's working state.
    pub fn update_state(
        &self,
        mission_id: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        let mission = state.mission_mut(mission_id)?;
        mission.require(&[MissionStatus::Running], "update state of")?;
        mission.state.insert(key.into(), value);
        Ok(())
    }

    /// Accrue cost on a running mission and debit its tenant.
    pub fn record_cost(&self, mission_id: &str, amount: f64) -> Result<(), SchedulerError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(SchedulerError::Validation(format!(
                "cost must be >= 0, got {}",
                amount
            )));
        }
        let mut state = self.state.lock();
        let mission = state.mission_mut(mission_id)?;
        mission.require(&[MissionStatus::Running], "record cost for")?;
        self.charge(mission, amount)
    }

    fn charge(&self, mission: &mut Mission, amount: f64) -> Result<(), SchedulerError> {
        self.ledger
            .debit(&mission.request.tenant, amount)
            .map_err(|e| SchedulerError::Validation(e.to_string()))?;
        mission.cost += amount;
        Ok(())
    }

    pub fn complete(&self, mission_id: &str, result: serde_json::Value) -> Result<(), SchedulerError> {
        let event = {
            let mut state = self.state.lock();
            self.complete_locked(&mut state, mission_id, result)?
        };
        self.events.publish(event);
        Ok(())
    }

    fn complete_locked(
        &self,
        state: &mut SchedulerState,
        mission_id: &str,
        result: serde_json::Value,
    ) -> Result<RelayEvent, SchedulerError> {
        let now = self.clock.now();
        let mission = state.mission_mut(mission_id)?;
        mission.require(&[MissionStatus::Running], "complete")?;
        mission.result = Some(result);
        mission.completed_at = Some(now);
        mission.progress = 100;
        let event = mission.transition(MissionStatus::Completed);
        state.completions.push_back(now);
        state.completed += 1;
        tracing::info!(mission_id, "Mission completed");
        ::metrics::counter!("relay_missions_completed_total").increment(1);
        Ok(event)
    }

    pub fn fail(&self, mission_id: &str, reason: impl Into<String>) -> Result<(), SchedulerError> {
        let event = {
            let mut state = self.state.lock();
            self.fail_locked(&mut state, mission_id, reason.into())?
        };
        self.events.publish(event);
        Ok(())
    }

    fn fail_locked(
        &self,
        state: &mut SchedulerState,
        mission_id: &str,
        reason: String,
    ) -> Result<RelayEvent, SchedulerError> {
        let now = self.clock.now();
        let mission = state.mission_mut(mission_id)?;
        mission.require(&[MissionStatus::Running], "fail")?;
        tracing::warn!(mission_id, reason = %reason, "Mission failed");
        mission.failure = Some(reason);
        mission.completed_at = Some(now);
        let event = mission.transition(MissionStatus::Failed);
        state.failed += 1;
        ::metrics::counter!("relay_missions_failed_total").increment(1);
        Ok(event)
    }

    /// Cancel a queued, paused or running mission.
    ///
    /// In-flight agent calls are not aborted; their results are discarded.
    pub fn cancel(&self, mission_id: &str) -> Result<(), SchedulerError> {
        let event = {
            let mut state = self.state.lock();
            let now = self.clock.now();
            let mission = state.mission_mut(mission_id)?;
            mission.require(
                &[MissionStatus::Queued, MissionStatus::Paused, MissionStatus::Running],
                "cancel",
            )?;
            mission.completed_at = Some(now);
            let event = mission.transition(MissionStatus::Cancelled);
            state.queue.remove(mission_id);
            state.cancelled += 1;
            event
        };
        tracing::info!(mission_id, "Mission cancelled");
        self.events.publish(event);
        Ok(())
    }

    /// Invoke one agent directly for a mission, honouring the mission's timeout.
    pub async fn execute_agent(
        &self,
        mission_id: &str,
        agent_id: &str,
    ) -> Result<AgentOutput, SchedulerError> {
        let request = Arc::clone(&self.state.lock().mission(mission_id)?.request);
        let agent = self
            .agents
            .get(agent_id)
            .map(|a| Arc::clone(a.value()))
            .ok_or_else(|| SchedulerError::AgentNotFound(agent_id.to_string()))?;

        let result = match request.timeout_ms {
            Some(timeout_ms) => {
                tokio::time::timeout(Duration::from_millis(timeout_ms), agent.invoke(&request))
                    .await
                    .map_err(|_| SchedulerError::AgentTimeout {
                        mission_id: mission_id.to_string(),
                        agent_id: agent_id.to_string(),
                        timeout_ms,
                    })?
            }
            None => agent.invoke(&request).await,
        };

        result.and_then(AgentOutput::checked).map_err(|e| match e {
            AgentError::Unsupported(_) => SchedulerError::AgentDoesNotSupportInvoke {
                agent_id: agent_id.to_string(),
            },
            other => SchedulerError::Agent(other),
        })
    }

    /// Run a running mission through its plan, assigned agent first.
    ///
    /// Agents are tried sequentially through the shared fallback chain. On
    /// success the cost is recorded and the mission completed; on exhaustion
    /// it is failed. If the mission stopped running meanwhile the outcome is
    /// discarded.
    pub async fn dispatch(&self, mission_id: &str) -> Result<DispatchOutcome, SchedulerError> {
        let (request, chain, lease) = {
            let mut state = self.state.lock();
            let mission = state.mission_mut(mission_id)?;
            mission.require(&[MissionStatus::Running], "dispatch")?;
            if mission.in_flight {
                return Err(SchedulerError::InvalidTransition {
                    mission_id: mission_id.to_string(),
                    from: mission.status,
                    operation: "dispatch",
                });
            }
            mission.in_flight = true;

            let assigned = mission.agent.clone();
            let mut chain: Vec<Arc<Worker>> = mission.plan.agents().cloned().collect();
            if let Some(assigned) = &assigned {
                if let Some(pos) = chain.iter().position(|w| &w.id == assigned) {
                    let worker = chain.remove(pos);
                    chain.insert(0, worker);
                }
            }
            (Arc::clone(&mission.request), chain, mission.lease.take())
        };

        let timeout = request
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.invoke_timeout);
        let runner = FallbackRunner::new(&self.catalog, &self.breakers, &self.telemetry, timeout);
        let outcome = runner
            .run(&chain, lease, |worker| {
                let agent = self.agents.get(&worker.id).map(|a| Arc::clone(a.value()));
                let request = Arc::clone(&request);
                async move {
                    match agent {
                        Some(agent) => agent.invoke(&request).await,
                        None => Err(AgentError::Unsupported("invoke")),
                    }
                }
            })
            .await;

        let (result, event) = {
            let mut state = self.state.lock();
            let mission = state.mission_mut(mission_id)?;
            mission.in_flight = false;
            if mission.status != MissionStatus::Running {
                tracing::info!(mission_id, status = %mission.status, "Discarding late agent result");
                return Ok(DispatchOutcome::Discarded {
                    status: mission.status,
                });
            }

            match outcome {
                Ok(success) => match self.charge(mission, success.output.cost) {
                    Ok(()) => {
                        mission.agent = Some(success.worker.id.clone());
                        let value = success.output.value.clone();
                        let event = self.complete_locked(&mut state, mission_id, value)?;
                        let outcome = DispatchOutcome::Completed {
                            agent_id: success.worker.id.clone(),
                            output: success.output,
                        };
                        (Ok(outcome), event)
                    }
                    Err(error) => {
                        let event = self.fail_locked(&mut state, mission_id, error.to_string())?;
                        (Err(error), event)
                    }
                },
                Err(exhausted) => {
                    let reason = exhausted
                        .last_error
                        .as_ref()
                        .map_or_else(|| "no agent available".to_string(), ToString::to_string);
                    let event = self.fail_locked(&mut state, mission_id, reason)?;
                    let error = SchedulerError::AllAgentsExhausted {
                        mission_id: mission_id.to_string(),
                        attempts: exhausted.attempts,
                        last_error: exhausted.last_error,
                    };
                    (Err(error), event)
                }
            }
        };
        self.events.publish(event);
        result
    }

    /// Start the first queued mission if one of its plan agents has capacity.
    ///
    /// Paused missions are skipped; they wait for an explicit resume.
    pub fn tick(&self) -> Option<String> {
        let (mission_id, event) = {
            let mut state = self.state.lock();
            let head = state
                .queue
                .iter()
                .map(|e| e.mission_id.clone())
                .find(|id| {
                    state
                        .missions
                        .get(id)
                        .is_some_and(|m| m.status == MissionStatus::Queued)
                })?;
            match self.start_locked(&mut state, &head) {
                Ok((_, event)) => (head, event),
                Err(e) => {
                    tracing::debug!(mission_id = %head, error = %e, "Queue head cannot start yet");
                    return None;
                }
            }
        };
        self.events.publish(event);
        Some(mission_id)
    }

    /// Run [`tick`](Self::tick) every `tick_interval` until cancelled.
    pub fn spawn_tick_loop(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!("Scheduler tick loop started");
            let mut interval = tokio::time::interval(scheduler.config.tick_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Scheduler tick loop shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        scheduler.tick();
                    }
                }
            }
        })
    }

    pub fn mission(&self, mission_id: &str) -> Result<MissionSnapshot, SchedulerError> {
        Ok(self.state.lock().mission(mission_id)?.snapshot())
    }

    /// Waiting mission ids in queue order.
    pub fn queued(&self) -> Vec<String> {
        self.state.lock().queue.ids()
    }

    pub fn queue_metrics(&self) -> QueueMetrics {
        let now = self.clock.now();
        let window = clock::seconds(self.config.throughput_window_seconds);
        let cutoff = clock::saturating_sub(now, window);
        let mut state = self.state.lock();

        while state.completions.front().is_some_and(|t| *t < cutoff) {
            state.completions.pop_front();
        }

        let waits: Vec<f64> = state
            .queue
            .iter()
            .filter_map(|e| state.missions.get(&e.mission_id))
            .map(|m| (now - m.enqueued_at).num_milliseconds().max(0) as f64)
            .collect();
        let avg_wait_time_ms = if waits.is_empty() {
            0.0
        } else {
            waits.iter().sum::<f64>() / waits.len() as f64
        };

        QueueMetrics {
            queue_length: state.queue.len(),
            running: state
                .missions
                .values()
                .filter(|m| m.status == MissionStatus::Running)
                .count(),
            avg_wait_time_ms,
            throughput: state.completions.len(),
            throughput_window_seconds: self.config.throughput_window_seconds,
            rejection_rate: metrics::rejection_rate(state.accepted, state.rejected),
            accepted: state.accepted,
            rejected: state.rejected,
            completed: state.completed,
            failed: state.failed,
            cancelled: state.cancelled,
        }
    }
}

/// Requirement violations of a ranked candidate for a mission.
fn violations(candidate: &Scored, request: &MissionRequest) -> Vec<String> {
    let worker = &candidate.worker;
    let cost = candidate.estimated_cost;
    let mut out = Vec::new();

    if cost > request.budget {
        out.push(format!(
            "agent '{}' estimated cost {:.4} exceeds mission budget {:.4}",
            worker.id, cost, request.budget
        ));
    }
    if let Some(max_cost) = request.constraints.max_cost {
        if cost > max_cost {
            out.push(format!(
                "agent '{}' estimated cost {:.4} exceeds max cost {:.4}",
                worker.id, cost, max_cost
            ));
        }
    }
    if let Some(max_latency) = request.constraints.max_latency_ms {
        let latency = worker.avg_latency_ms();
        if latency > max_latency {
            out.push(format!(
                "agent '{}' estimated latency {}ms exceeds max latency {}ms",
                worker.id, latency, max_latency
            ));
        }
    }
    if let Some(min_quality) = request.constraints.min_quality {
        if worker.quality_score < min_quality {
            out.push(format!(
                "agent '{}' quality {:.2} below minimum {:.2}",
                worker.id, worker.quality_score, min_quality
            ));
        }
    }
    out
}
