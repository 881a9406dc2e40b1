//! Per-worker circuit breaker state machine.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::clock;
use crate::config::BreakerConfig;

/// Circuit breaker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, attempts allowed
    #[default]
    Closed,
    /// Tripped, attempts blocked until `next_retry_at`
    Open,
    /// Cooldown elapsed, a single probe is in flight
    HalfOpen,
}

/// Transition caused by recording an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Closed,
}

/// Tracks breaker state for a single worker.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BreakerState {
    pub state: CircuitState,
    /// Consecutive failures since the last success
    pub failure_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    /// When the outstanding half-open probe was handed out
    #[serde(skip)]
    probe_started_at: Option<DateTime<Utc>>,
}

impl BreakerState {
    /// Read-only check: would an attempt be allowed right now?
    ///
    /// Does not claim the half-open probe.
    pub fn is_available(&self, now: DateTime<Utc>, config: &BreakerConfig) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => self.next_retry_at.is_none_or(|at| now >= at),
            CircuitState::HalfOpen => self.probe_is_stale(now, config),
        }
    }

    /// Decide whether an attempt may proceed, claiming the probe slot when
    /// the cooldown has elapsed.
    pub fn try_attempt(&mut self, now: DateTime<Utc>, config: &BreakerConfig) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if self.next_retry_at.is_none_or(|at| now >= at) {
                    self.state = CircuitState::HalfOpen;
                    self.probe_started_at = Some(now);
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                // A probe that never reported back frees its slot after one delay.
                if self.probe_is_stale(now, config) {
                    self.probe_started_at = Some(now);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Apply a successful outcome. Returns `Some(Closed)` if the breaker was
    /// not already closed.
    pub fn on_success(&mut self) -> Option<Transition> {
        let was = self.state;
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.next_retry_at = None;
        self.probe_started_at = None;
        (was != CircuitState::Closed).then_some(Transition::Closed)
    }

    /// Apply a failed outcome. Returns `Some(Opened)` when the breaker trips
    /// or a half-open probe fails.
    pub fn on_failure(&mut self, now: DateTime<Utc>, config: &BreakerConfig) -> Option<Transition> {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_at = Some(now);

        match self.state {
            CircuitState::Closed if self.failure_count >= config.failure_threshold => {
                self.open(now, config);
                Some(Transition::Opened)
            }
            CircuitState::HalfOpen => {
                self.open(now, config);
                Some(Transition::Opened)
            }
            _ => None,
        }
    }

    fn open(&mut self, now: DateTime<Utc>, config: &BreakerConfig) {
        self.state = CircuitState::Open;
        self.next_retry_at = Some(clock::saturating_add(now, half_open_delay(config)));
        self.probe_started_at = None;
    }

    fn probe_is_stale(&self, now: DateTime<Utc>, config: &BreakerConfig) -> bool {
        self.probe_started_at
            .is_none_or(|started| now - started >= half_open_delay(config))
    }
}

fn half_open_delay(config: &BreakerConfig) -> Duration {
    clock::seconds(config.half_open_delay_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            half_open_delay_seconds: 30,
        }
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let cfg = config();
        let now = Utc::now();
        let mut state = BreakerState::default();

        assert_eq!(state.on_failure(now, &cfg), None);
        assert_eq!(state.on_failure(now, &cfg), None);
        assert_eq!(state.on_failure(now, &cfg), Some(Transition::Opened));
        assert_eq!(state.state, CircuitState::Open);
        assert_eq!(state.next_retry_at, Some(now + Duration::seconds(30)));
        assert!(!state.is_available(now, &cfg));
    }

    #[test]
    fn success_resets_consecutive_count() {
        let cfg = config();
        let now = Utc::now();
        let mut state = BreakerState::default();

        state.on_failure(now, &cfg);
        state.on_failure(now, &cfg);
        assert_eq!(state.on_success(), None);
        assert_eq!(state.failure_count, 0);
        assert_eq!(state.on_failure(now, &cfg), None);
        assert_eq!(state.state, CircuitState::Closed);
    }

    #[test]
    fn single_probe_after_cooldown() {
        let cfg = config();
        let now = Utc::now();
        let mut state = BreakerState::default();
        for _ in 0..3 {
            state.on_failure(now, &cfg);
        }

        let later = now + Duration::seconds(30);
        assert!(state.is_available(later, &cfg));
        assert!(state.try_attempt(later, &cfg));
        assert_eq!(state.state, CircuitState::HalfOpen);
        assert!(!state.try_attempt(later, &cfg));
        assert!(!state.is_available(later, &cfg));
    }

    #[test]
    fn half_open_failure_renews_delay() {
        let cfg = config();
        let now = Utc::now();
        let mut state = BreakerState::default();
        for _ in 0..3 {
            state.on_failure(now, &cfg);
        }

        let later = now + Duration::seconds(31);
        assert!(state.try_attempt(later, &cfg));
        assert_eq!(state.on_failure(later, &cfg), Some(Transition::Opened));
        assert_eq!(state.next_retry_at, Some(later + Duration::seconds(30)));
        assert!(!state.try_attempt(later + Duration::seconds(29), &cfg));
    }

    #[test]
    fn half_open_success_closes() {
        let cfg = config();
        let now = Utc::now();
        let mut state = BreakerState::default();
        for _ in 0..3 {
            state.on_failure(now, &cfg);
        }

        assert!(state.try_attempt(now + Duration::seconds(30), &cfg));
        assert_eq!(state.on_success(), Some(Transition::Closed));
        assert_eq!(state.state, CircuitState::Closed);
        assert_eq!(state.failure_count, 0);
    }

    #[test]
    fn oversized_delay_keeps_breaker_open() {
        let cfg = BreakerConfig {
            failure_threshold: 1,
            half_open_delay_seconds: 10_000_000_000_000,
        };
        let now = Utc::now();
        let mut state = BreakerState::default();

        assert_eq!(state.on_failure(now, &cfg), Some(Transition::Opened));
        assert_eq!(state.next_retry_at, Some(DateTime::<Utc>::MAX_UTC));
        assert!(!state.try_attempt(now + Duration::days(365), &cfg));
    }

    #[test]
    fn stale_probe_releases_slot() {
        let cfg = config();
        let now = Utc::now();
        let mut state = BreakerState::default();
        for _ in 0..3 {
            state.on_failure(now, &cfg);
        }

        let probe_at = now + Duration::seconds(30);
        assert!(state.try_attempt(probe_at, &cfg));
        assert!(state.try_attempt(probe_at + Duration::seconds(30), &cfg));
    }
}
