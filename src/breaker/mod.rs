//! Circuit breaker bank.
//!
//! One breaker per worker gates whether attempts may be made against it.
//! State is consulted fresh on every attempt because it can flip between
//! fallback hops within a single request.

mod state;

pub use state::*;

use dashmap::DashMap;

use crate::clock::SharedClock;
use crate::config::BreakerConfig;
use crate::events::{EventBus, RelayEvent};

/// Per-worker breakers, created lazily.
pub struct CircuitBreakerBank {
    states: DashMap<String, BreakerState>,
    config: BreakerConfig,
    clock: SharedClock,
    events: EventBus,
}

impl CircuitBreakerBank {
    pub fn new(config: BreakerConfig, clock: SharedClock, events: EventBus) -> Self {
        Self {
            states: DashMap::new(),
            config,
            clock,
            events,
        }
    }

    /// Ensure a closed breaker exists for the worker.
    pub fn register(&self, worker_id: &str) {
        self.states.entry(worker_id.to_string()).or_default();
    }

    /// Whether an attempt against the worker may proceed now.
    ///
    /// When an open breaker's cooldown has elapsed this moves it to half-open
    /// and hands out the single probe; callers must follow up with
    /// [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure).
    pub fn can_attempt(&self, worker_id: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.states.entry(worker_id.to_string()).or_default();
        let before = state.state;
        let allowed = state.try_attempt(now, &self.config);
        if before == CircuitState::Open && state.state == CircuitState::HalfOpen {
            tracing::info!(worker_id, "Circuit breaker half-open, allowing probe");
        }
        allowed
    }

    /// Read-only eligibility check used when building candidate lists.
    pub fn is_available(&self, worker_id: &str) -> bool {
        let now = self.clock.now();
        self.states
            .get(worker_id)
            .is_none_or(|state| state.is_available(now, &self.config))
    }

    pub fn record_success(&self, worker_id: &str) {
        let transition = self
            .states
            .entry(worker_id.to_string())
            .or_default()
            .on_success();

        if transition == Some(Transition::Closed) {
            tracing::info!(worker_id, "Circuit breaker closed after successful probe");
            self.events.publish(RelayEvent::CircuitClosed {
                worker_id: worker_id.to_string(),
            });
        }
    }

    pub fn record_failure(&self, worker_id: &str) {
        let now = self.clock.now();
        let (transition, snapshot) = {
            let mut state = self.states.entry(worker_id.to_string()).or_default();
            let transition = state.on_failure(now, &self.config);
            (transition, state.clone())
        };

        if transition == Some(Transition::Opened) {
            let next_retry_at = snapshot.next_retry_at.unwrap_or(now);
            tracing::warn!(
                worker_id,
                failure_count = snapshot.failure_count,
                next_retry_at = %next_retry_at,
                "Circuit breaker opened"
            );
            metrics::counter!("relay_circuit_opened_total").increment(1);
            self.events.publish(RelayEvent::CircuitOpened {
                worker_id: worker_id.to_string(),
                failure_count: snapshot.failure_count,
                next_retry_at,
            });
        }
    }

    /// Current state for inspection; unseen workers report a closed breaker.
    pub fn snapshot(&self, worker_id: &str) -> BreakerState {
        self.states
            .get(worker_id)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }
}
