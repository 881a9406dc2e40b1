//! Cost-aware routing
//!
//! The router picks the best worker for a request under budget, latency and
//! quality constraints, then executes the decision through the fallback chain.
//!
//! ```text
//! route(request)
//!   budget exhausted? ──> BudgetExhausted
//!   cache hit?        ──> zero-cost Decision (source = Cache)
//!   catalog candidates ∩ breaker available ──> empty? NoAvailableModel
//!   rank by score, take first affordable   ──> none?  BudgetInsufficient
//!   projected budget alerts
//!   winner + next-ranked fallbacks
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub mod cache;
pub mod decision;
pub mod error;
pub mod request;
pub mod scoring;

pub use cache::{cache_key, ResponseCache};
pub use decision::{Decision, DecisionSource, DecisionView, ExecutionResult};
pub use error::RoutingError;
pub use request::RoutingRequest;
pub use scoring::{rank, score, ScoreContext, Scored};

use crate::agent::{AgentError, AgentOutput};
use crate::breaker::{BreakerState, CircuitBreakerBank};
use crate::budget::{BudgetLedger, BudgetTracker};
use crate::catalog::{Catalog, CatalogError, Worker};
use crate::clock::SharedClock;
use crate::config::{RelayConfig, RoutingConfig, ScoringConfig};
use crate::events::EventBus;
use crate::fallback::FallbackRunner;
use crate::telemetry::{MetricsLog, WorkerSummary};

/// Selects workers for requests and executes the resulting decisions.
pub struct Router {
    catalog: Arc<Catalog>,
    breakers: Arc<CircuitBreakerBank>,
    ledger: Arc<BudgetLedger>,
    telemetry: Arc<MetricsLog>,
    cache: ResponseCache,
    routing: RoutingConfig,
    scoring: ScoringConfig,
    events: EventBus,
}

impl Router {
    /// Create a router with empty catalog and fresh ledger.
    pub fn new(config: &RelayConfig, clock: SharedClock, events: EventBus) -> Self {
        Self {
            catalog: Arc::new(Catalog::new()),
            breakers: Arc::new(CircuitBreakerBank::new(
                config.breaker.clone(),
                clock.clone(),
                events.clone(),
            )),
            ledger: Arc::new(BudgetLedger::new(
                config.budget.clone(),
                clock.clone(),
                events.clone(),
            )),
            telemetry: Arc::new(MetricsLog::new(config.telemetry.clone(), clock.clone())),
            cache: ResponseCache::new(clock),
            routing: config.routing.clone(),
            scoring: config.scoring.clone(),
            events,
        }
    }

    /// Create a router and register every worker declared in the config.
    pub fn from_config(
        config: &RelayConfig,
        clock: SharedClock,
        events: EventBus,
    ) -> Result<Self, CatalogError> {
        let router = Self::new(config, clock, events);
        for worker in &config.workers {
            router.register_worker(worker.to_worker())?;
        }
        Ok(router)
    }

    pub fn register_worker(&self, worker: Worker) -> Result<Arc<Worker>, CatalogError> {
        let worker = self.catalog.register(worker)?;
        self.breakers.register(&worker.id);
        Ok(worker)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerBank> {
        &self.breakers
    }

    pub fn ledger(&self) -> &Arc<BudgetLedger> {
        &self.ledger
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Choose a worker and fallbacks for a request.
    ///
    /// # Errors
    ///
    /// - `Validation` for malformed requests
    /// - `BudgetExhausted` when the tenant has nothing left (checked first)
    /// - `NoAvailableModel` when no worker passes the filters
    /// - `BudgetInsufficient` when no candidate fits the remaining budget
    pub fn route(&self, request: &RoutingRequest) -> Result<Decision, RoutingError> {
        request.validate().map_err(RoutingError::Validation)?;

        let remaining = self.ledger.remaining(&request.tenant);
        if remaining <= 0.0 {
            tracing::warn!(tenant = %request.tenant, remaining, "Rejecting request, budget exhausted");
            metrics::counter!("relay_route_rejections_total", "reason" => "budget_exhausted")
                .increment(1);
            return Err(RoutingError::BudgetExhausted {
                tenant: request.tenant.clone(),
            });
        }

        if let Some(decision) = self.cached_decision(request) {
            metrics::counter!("relay_cache_hits_total").increment(1);
            return Ok(decision);
        }

        let tokens = request.tokens.unwrap_or_else(|| self.routing.default_tokens());
        let candidates: Vec<_> = self
            .catalog
            .list_candidates(&request.constraints, tokens)
            .into_iter()
            .filter(|w| self.breakers.is_available(&w.id))
            .collect();
        if candidates.is_empty() {
            metrics::counter!("relay_route_rejections_total", "reason" => "no_available_model")
                .increment(1);
            return Err(RoutingError::NoAvailableModel {
                domain: request.domain.clone(),
            });
        }

        let ctx = ScoreContext {
            priority: request.priority,
            profile: self.scoring.router_profile(&request.domain),
            tokens,
        };
        let ranked = rank(candidates, &ctx, &self.scoring);

        let Some(index) = ranked.iter().position(|s| s.estimated_cost <= remaining) else {
            let required = ranked
                .iter()
                .map(|s| s.estimated_cost)
                .fold(f64::INFINITY, f64::min);
            metrics::counter!("relay_route_rejections_total", "reason" => "budget_insufficient")
                .increment(1);
            return Err(RoutingError::BudgetInsufficient {
                tenant: request.tenant.clone(),
                required,
                remaining,
                shortfall: required - remaining,
            });
        };
        if index > 0 {
            tracing::debug!(
                top = %ranked[0].worker.id,
                chosen = %ranked[index].worker.id,
                remaining,
                "Top candidate over budget, chose next affordable"
            );
        }

        let winner = &ranked[index];
        let projected_alerts = self
            .ledger
            .check_projected(&request.tenant, winner.estimated_cost);

        let fallbacks = ranked[index + 1..]
            .iter()
            .filter(|s| s.estimated_cost <= remaining)
            .take(self.routing.max_fallbacks)
            .map(|s| Arc::clone(&s.worker))
            .collect();

        tracing::info!(
            request_id = %request.id,
            tenant = %request.tenant,
            worker_id = %winner.worker.id,
            score = winner.score,
            estimated_cost = winner.estimated_cost,
            "Routed request"
        );

        Ok(Decision {
            request_id: request.id.clone(),
            tenant: request.tenant.clone(),
            primary: Arc::clone(&winner.worker),
            score: winner.score,
            estimated_cost: winner.estimated_cost,
            estimated_latency_ms: winner.worker.avg_latency_ms(),
            estimated_quality: winner.worker.quality_score,
            fallbacks,
            source: DecisionSource::Scored,
            projected_alerts,
            cached: None,
        })
    }

    fn cached_decision(&self, request: &RoutingRequest) -> Option<Decision> {
        let key = cache_key(&request.domain, &request.task, &request.constraints);
        let cached = self.cache.get(key)?;
        let Some(worker) = self.catalog.get(&cached.worker_id) else {
            self.cache.remove(key);
            return None;
        };

        tracing::debug!(request_id = %request.id, worker_id = %worker.id, "Served from cache");
        Some(Decision {
            request_id: request.id.clone(),
            tenant: request.tenant.clone(),
            estimated_latency_ms: 0,
            estimated_quality: worker.quality_score,
            primary: worker,
            score: 0.0,
            estimated_cost: 0.0,
            fallbacks: Vec::new(),
            source: DecisionSource::Cache,
            projected_alerts: Vec::new(),
            cached: Some(ExecutionResult {
                from_cache: true,
                attempts: Vec::new(),
                latency_ms: 0,
                ..cached
            }),
        })
    }

    /// Execute a decision, walking primary then fallbacks until one succeeds.
    ///
    /// Cache decisions replay the stored response without invoking anything.
    /// On success the tenant is debited with the actual cost reported by the
    /// worker.
    pub async fn execute<F, Fut>(
        &self,
        decision: &Decision,
        invoke: F,
    ) -> Result<ExecutionResult, RoutingError>
    where
        F: FnMut(Arc<Worker>) -> Fut,
        Fut: Future<Output = Result<AgentOutput, AgentError>>,
    {
        if let Some(cached) = &decision.cached {
            return Ok(cached.clone());
        }

        let runner = FallbackRunner::new(
            &self.catalog,
            &self.breakers,
            &self.telemetry,
            self.routing.invoke_timeout(),
        );
        match runner.run(&decision.chain(), None, invoke).await {
            Ok(success) => {
                self.ledger.debit(&decision.tenant, success.output.cost)?;
                Ok(ExecutionResult {
                    worker_id: success.worker.id.clone(),
                    output: success.output,
                    latency_ms: success.latency_ms,
                    attempts: success.attempts,
                    from_cache: false,
                })
            }
            Err(exhausted) => {
                tracing::error!(
                    request_id = %decision.request_id,
                    attempts = exhausted.attempts.len(),
                    "All providers exhausted"
                );
                Err(RoutingError::AllProvidersExhausted {
                    attempts: exhausted.attempts,
                    last_error: exhausted.last_error,
                })
            }
        }
    }

    /// Route then execute.
    pub async fn route_and_execute<F, Fut>(
        &self,
        request: &RoutingRequest,
        invoke: F,
    ) -> Result<ExecutionResult, RoutingError>
    where
        F: FnMut(Arc<Worker>) -> Fut,
        Fut: Future<Output = Result<AgentOutput, AgentError>>,
    {
        let decision = self.route(request)?;
        self.execute(&decision, invoke).await
    }

    /// Store a result for replay to identical requests.
    ///
    /// `ttl` defaults to the configured cache lifetime.
    pub fn cache_response(
        &self,
        request: &RoutingRequest,
        result: &ExecutionResult,
        ttl: Option<Duration>,
    ) {
        let key = cache_key(&request.domain, &request.task, &request.constraints);
        self.cache.insert(
            key,
            result.clone(),
            ttl.unwrap_or_else(|| self.routing.cache_ttl()),
        );
    }

    pub fn purge_expired_cache(&self) -> usize {
        self.cache.purge_expired()
    }

    pub fn budget(&self, tenant: &str) -> BudgetTracker {
        self.ledger.get(tenant)
    }

    pub fn metrics_summary(&self) -> Vec<WorkerSummary> {
        self.telemetry.summary()
    }

    pub fn breaker_state(&self, worker_id: &str) -> BreakerState {
        self.breakers.snapshot(worker_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CostModel, Tier, TokenEstimate};
    use crate::clock::ManualClock;
    use crate::request::{Constraints, Priority};

    fn router() -> (Router, ManualClock) {
        let clock = ManualClock::new();
        let router = Router::new(&RelayConfig::default(), Arc::new(clock.clone()), EventBus::new());
        (router, clock)
    }

    fn flat(id: &str, tier: Tier, per_call: f64) -> Worker {
        Worker::new(id, "test", tier, CostModel::Flat { per_call })
            .with_capabilities(["chat", "code"])
            .with_performance(100, 200)
    }

    fn ok(value: &str, cost: f64) -> Result<AgentOutput, AgentError> {
        Ok(AgentOutput::new(serde_json::json!(value), cost))
    }

    #[test]
    fn test_route_picks_highest_score() {
        let (router, _) = router();
        router.register_worker(flat("fast", Tier::Fast, 0.01)).unwrap();
        router.register_worker(flat("quality", Tier::Quality, 0.05)).unwrap();

        let decision = router.route(&RoutingRequest::new("chat", "hi")).unwrap();
        assert_eq!(decision.primary.id, "quality");
        assert_eq!(decision.fallbacks.len(), 1);
        assert_eq!(decision.fallbacks[0].id, "fast");
        assert_eq!(decision.source, DecisionSource::Scored);
    }

    #[test]
    fn test_route_rejects_invalid_request() {
        let (router, _) = router();
        let request = RoutingRequest::new("", "hi");
        assert!(matches!(router.route(&request), Err(RoutingError::Validation(_))));
    }

    #[test]
    fn test_route_exhausted_budget_checked_before_catalog() {
        let (router, _) = router();
        router.ledger().set_total("acme", 0.0).unwrap();
        let request = RoutingRequest::new("chat", "hi").with_tenant("acme");
        assert!(matches!(
            router.route(&request),
            Err(RoutingError::BudgetExhausted { ref tenant }) if tenant == "acme"
        ));
    }

    #[test]
    fn test_route_no_candidates() {
        let (router, _) = router();
        router.register_worker(flat("a", Tier::Fast, 0.01)).unwrap();
        let request = RoutingRequest::new("vision", "describe").with_constraints(Constraints {
            required_capabilities: vec!["vision".into()],
            ..Default::default()
        });
        assert!(matches!(
            router.route(&request),
            Err(RoutingError::NoAvailableModel { .. })
        ));
    }

    #[test]
    fn test_route_budget_insufficient_reports_shortfall() {
        let (router, _) = router();
        router.register_worker(flat("a", Tier::Quality, 2.0)).unwrap();
        router.register_worker(flat("b", Tier::Fast, 1.5)).unwrap();
        router.ledger().set_total("t", 1.0).unwrap();

        let request = RoutingRequest::new("chat", "hi").with_tenant("t");
        match router.route(&request) {
            Err(RoutingError::BudgetInsufficient {
                required,
                remaining,
                shortfall,
                ..
            }) => {
                assert_eq!(required, 1.5);
                assert_eq!(remaining, 1.0);
                assert!((shortfall - 0.5).abs() < 1e-9);
            }
            other => panic!("expected BudgetInsufficient, got {:?}", other),
        }
    }

    #[test]
    fn test_open_breaker_excluded_from_candidates() {
        let (router, _) = router();
        router.register_worker(flat("quality", Tier::Quality, 0.01)).unwrap();
        router.register_worker(flat("fast", Tier::Fast, 0.01)).unwrap();
        for _ in 0..5 {
            router.breakers().record_failure("quality");
        }

        let decision = router.route(&RoutingRequest::new("chat", "hi")).unwrap();
        assert_eq!(decision.primary.id, "fast");
        assert!(decision.fallbacks.is_empty());
    }

    #[test]
    fn test_fallbacks_capped() {
        let (router, _) = router();
        for i in 0..6 {
            router
                .register_worker(flat(&format!("w{}", i), Tier::Balanced, 0.01))
                .unwrap();
        }
        let decision = router.route(&RoutingRequest::new("chat", "hi")).unwrap();
        assert_eq!(decision.primary.id, "w0");
        let ids: Vec<_> = decision.fallbacks.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["w1", "w2", "w3"]);
    }

    #[test]
    fn test_priority_changes_selection() {
        let (router, _) = router();
        router.register_worker(flat("fast", Tier::Fast, 0.0)).unwrap();
        router.register_worker(flat("balanced", Tier::Balanced, 0.0)).unwrap();

        let low = RoutingRequest::new("other", "x").with_priority(Priority::Low);
        // fast: 60 - 1 + 15 = 74; balanced: 80 - 1 = 79
        assert_eq!(router.route(&low).unwrap().primary.id, "balanced");

        let tokens = RoutingRequest::new("other", "x").with_tokens(TokenEstimate::new(10, 10));
        assert_eq!(router.route(&tokens).unwrap().primary.id, "balanced");
    }

    #[tokio::test]
    async fn test_execute_debits_actual_cost() {
        let (router, _) = router();
        router.register_worker(flat("a", Tier::Quality, 0.05)).unwrap();

        let decision = router.route(&RoutingRequest::new("chat", "hi")).unwrap();
        let result = router
            .execute(&decision, |_| async { ok("done", 0.04) })
            .await
            .unwrap();

        assert_eq!(result.worker_id, "a");
        assert!(!result.from_cache);
        let budget = router.budget("default");
        assert!((budget.spent - 0.04).abs() < 1e-9);
        assert!((budget.remaining - (budget.total - budget.spent)).abs() < 1e-9);
        assert_eq!(router.metrics_summary()[0].successes, 1);
    }

    #[tokio::test]
    async fn test_cache_round_trip() {
        let (router, clock) = router();
        router.register_worker(flat("a", Tier::Quality, 0.05)).unwrap();
        let request = RoutingRequest::new("chat", "same question");

        let result = router
            .route_and_execute(&request, |_| async { ok("answer", 0.05) })
            .await
            .unwrap();
        router.cache_response(&request, &result, Some(Duration::from_secs(60)));

        let repeat = RoutingRequest::new("chat", "same question");
        let decision = router.route(&repeat).unwrap();
        assert!(decision.is_cached());
        assert_eq!(decision.estimated_cost, 0.0);

        let calls = std::sync::atomic::AtomicUsize::new(0);
        let replay = router
            .execute(&decision, |_| {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async { ok("fresh", 0.05) }
            })
            .await
            .unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(replay.from_cache);
        assert_eq!(replay.output.value, serde_json::json!("answer"));
        // only the first execution was charged
        assert!((router.budget("default").spent - 0.05).abs() < 1e-9);

        clock.advance(chrono::Duration::seconds(61));
        assert!(!router.route(&repeat).unwrap().is_cached());
    }

    #[tokio::test]
    async fn test_cache_miss_when_worker_removed() {
        let (router, _) = router();
        router.register_worker(flat("a", Tier::Quality, 0.05)).unwrap();
        router.register_worker(flat("b", Tier::Fast, 0.01)).unwrap();
        let request = RoutingRequest::new("chat", "q");
        let result = router
            .route_and_execute(&request, |_| async { ok("x", 0.0) })
            .await
            .unwrap();
        router.cache_response(&request, &result, None);

        router.catalog().remove("a").unwrap();
        let decision = router.route(&request).unwrap();
        assert!(!decision.is_cached());
        assert_eq!(decision.primary.id, "b");
    }
}
