//! Worker catalog.
//!
//! Stores every registered worker (model/provider pair or agent) with its
//! pricing, performance and capability metadata, and answers candidate queries
//! in registration order so ranking ties stay deterministic.

mod error;
mod worker;

pub use error::*;
pub use worker::*;

use parking_lot::RwLock;
use std::sync::Arc;

use crate::request::Constraints;

/// Registry of workers available to a router or scheduler.
///
/// # Examples
///
/// ```
/// use relay::catalog::{Catalog, CostModel, Tier, Worker};
///
/// let catalog = Catalog::new();
/// catalog
///     .register(Worker::new("w1", "local", Tier::Fast, CostModel::Flat { per_call: 0.0 }))
///     .unwrap();
/// assert_eq!(catalog.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Catalog {
    workers: RwLock<Vec<Arc<Worker>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worker.
    ///
    /// # Errors
    ///
    /// `DuplicateWorker` if the id is taken, `InvalidWorker` if its metadata
    /// is out of range.
    pub fn register(&self, worker: Worker) -> Result<Arc<Worker>, CatalogError> {
        worker.validate()?;

        let mut workers = self.workers.write();
        if workers.iter().any(|w| w.id == worker.id) {
            return Err(CatalogError::DuplicateWorker(worker.id));
        }

        let worker = Arc::new(worker);
        workers.push(Arc::clone(&worker));
        tracing::debug!(
            worker_id = %worker.id,
            provider = %worker.provider,
            tier = %worker.tier,
            "Registered worker"
        );
        Ok(worker)
    }

    pub fn remove(&self, id: &str) -> Result<Arc<Worker>, CatalogError> {
        let mut workers = self.workers.write();
        let index = workers
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| CatalogError::WorkerNotFound(id.to_string()))?;
        Ok(workers.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<Arc<Worker>> {
        self.workers.read().iter().find(|w| w.id == id).cloned()
    }

    /// All workers in registration order.
    pub fn all(&self) -> Vec<Arc<Worker>> {
        self.workers.read().clone()
    }

    pub fn len(&self) -> usize {
        self.workers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.read().is_empty()
    }

    /// Workers satisfying every present constraint and with spare capacity.
    pub fn list_candidates(
        &self,
        constraints: &Constraints,
        tokens: TokenEstimate,
    ) -> Vec<Arc<Worker>> {
        self.workers
            .read()
            .iter()
            .filter(|w| w.supports_all(&constraints.required_capabilities))
            .filter(|w| w.has_capacity())
            .filter(|w| {
                constraints
                    .max_cost
                    .is_none_or(|max| w.cost_estimate(tokens) <= max)
            })
            .filter(|w| {
                constraints
                    .max_latency_ms
                    .is_none_or(|max| w.performance.p95_latency_ms <= max)
            })
            .filter(|w| constraints.min_quality.is_none_or(|min| w.quality_score >= min))
            .cloned()
            .collect()
    }

    /// Workers exposing every capability and with spare capacity.
    ///
    /// Cost, latency and quality are left to the caller.
    pub fn list_available<S: AsRef<str>>(&self, capabilities: &[S]) -> Vec<Arc<Worker>> {
        self.workers
            .read()
            .iter()
            .filter(|w| w.supports_all(capabilities) && w.has_capacity())
            .cloned()
            .collect()
    }

    /// Reserve one unit of capacity on a worker.
    ///
    /// Returns `None` if the worker is unknown or already at `max_concurrent`.
    /// Capacity is returned when the guard is dropped.
    pub fn acquire(&self, id: &str) -> Option<LoadGuard> {
        let worker = self.get(id)?;
        LoadGuard::try_new(worker)
    }

    /// Refresh a worker's observed latency after a successful attempt.
    pub fn record_latency(&self, id: &str, latency_ms: u32) {
        if let Some(worker) = self.get(id) {
            worker.observe_latency(latency_ms);
        }
    }
}

/// One unit of reserved worker capacity.
#[derive(Debug)]
pub struct LoadGuard {
    worker: Arc<Worker>,
}

impl LoadGuard {
    pub(crate) fn try_new(worker: Arc<Worker>) -> Option<Self> {
        worker.try_acquire().then_some(Self { worker })
    }

    pub fn worker(&self) -> &Arc<Worker> {
        &self.worker
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.worker.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(id: &str, tier: Tier, per_call: f64) -> Worker {
        Worker::new(id, "test", tier, CostModel::Flat { per_call })
            .with_capabilities(["chat"])
            .with_performance(500, 1000)
    }

    #[test]
    fn register_rejects_duplicates() {
        let catalog = Catalog::new();
        catalog.register(worker("a", Tier::Fast, 0.1)).unwrap();
        let result = catalog.register(worker("a", Tier::Quality, 0.2));
        assert!(matches!(result, Err(CatalogError::DuplicateWorker(id)) if id == "a"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn remove_unknown_worker_errors() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.remove("missing"),
            Err(CatalogError::WorkerNotFound(_))
        ));
    }

    #[test]
    fn candidates_preserve_registration_order() {
        let catalog = Catalog::new();
        for id in ["c", "a", "b"] {
            catalog.register(worker(id, Tier::Balanced, 0.1)).unwrap();
        }
        let ids: Vec<_> = catalog
            .list_candidates(&Constraints::default(), TokenEstimate::default())
            .iter()
            .map(|w| w.id.clone())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn candidates_filter_by_required_capabilities() {
        let catalog = Catalog::new();
        catalog.register(worker("chat-only", Tier::Fast, 0.1)).unwrap();
        catalog
            .register(worker("coder", Tier::Fast, 0.1).with_capabilities(["chat", "code"]))
            .unwrap();

        let constraints = Constraints {
            required_capabilities: vec!["code".to_string()],
            ..Default::default()
        };
        let candidates = catalog.list_candidates(&constraints, TokenEstimate::default());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "coder");
    }

    #[test]
    fn candidates_filter_by_cost_latency_quality() {
        let catalog = Catalog::new();
        catalog.register(worker("cheap", Tier::Fast, 0.1)).unwrap();
        catalog.register(worker("pricey", Tier::Quality, 0.9)).unwrap();
        catalog
            .register(worker("slow", Tier::Fast, 0.1).with_performance(4000, 9000))
            .unwrap();
        catalog
            .register(worker("sloppy", Tier::Fast, 0.1).with_quality(0.3))
            .unwrap();

        let constraints = Constraints {
            max_cost: Some(0.5),
            max_latency_ms: Some(2000),
            min_quality: Some(0.5),
            ..Default::default()
        };
        let ids: Vec<_> = catalog
            .list_candidates(&constraints, TokenEstimate::default())
            .iter()
            .map(|w| w.id.clone())
            .collect();
        assert_eq!(ids, vec!["cheap"]);
    }

    #[test]
    fn candidates_exclude_saturated_workers() {
        let catalog = Catalog::new();
        catalog
            .register(worker("single", Tier::Fast, 0.1).with_max_concurrent(1))
            .unwrap();

        let guard = catalog.acquire("single").unwrap();
        assert!(catalog
            .list_candidates(&Constraints::default(), TokenEstimate::default())
            .is_empty());
        assert!(catalog.acquire("single").is_none());

        drop(guard);
        assert_eq!(catalog.list_available(&["chat"]).len(), 1);
    }

    #[test]
    fn list_available_ignores_cost() {
        let catalog = Catalog::new();
        catalog.register(worker("pricey", Tier::Quality, 50.0)).unwrap();
        assert_eq!(catalog.list_available(&["chat"]).len(), 1);
        assert!(catalog.list_available(&["vision"]).is_empty());
    }

    #[test]
    fn record_latency_updates_observed_average() {
        let catalog = Catalog::new();
        catalog.register(worker("w", Tier::Fast, 0.1)).unwrap();
        catalog.record_latency("w", 0);
        assert_eq!(catalog.get("w").unwrap().avg_latency_ms(), 400);
        // Unknown ids are ignored.
        catalog.record_latency("missing", 10);
    }
}
