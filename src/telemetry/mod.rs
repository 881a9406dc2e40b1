//! Bounded in-memory attempt log.
//!
//! Every worker invocation (success or failure) is appended here and mirrored
//! to the `metrics` facade. The log is pruned by age and by entry count so it
//! stays bounded for long-running processes.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use crate::clock::{self, SharedClock};
use crate::config::TelemetryConfig;

/// Outcome of a single worker invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub worker_id: String,
    pub latency_ms: u32,
    pub cost: f64,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-worker aggregate over the retained records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerSummary {
    pub worker_id: String,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub total_cost: f64,
}

pub struct MetricsLog {
    records: Mutex<VecDeque<MetricRecord>>,
    config: TelemetryConfig,
    clock: SharedClock,
}

impl MetricsLog {
    pub fn new(config: TelemetryConfig, clock: SharedClock) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            config,
            clock,
        }
    }

    pub fn record_success(&self, worker_id: &str, latency_ms: u32, cost: f64) {
        self.push(MetricRecord {
            worker_id: worker_id.to_string(),
            latency_ms,
            cost,
            success: true,
            timestamp: self.clock.now(),
            error: None,
        });
    }

    pub fn record_failure(&self, worker_id: &str, latency_ms: u32, error: impl Into<String>) {
        self.push(MetricRecord {
            worker_id: worker_id.to_string(),
            latency_ms,
            cost: 0.0,
            success: false,
            timestamp: self.clock.now(),
            error: Some(error.into()),
        });
    }

    fn push(&self, record: MetricRecord) {
        let outcome = if record.success { "success" } else { "failure" };
        metrics::counter!(
            "relay_attempts_total",
            "worker" => record.worker_id.clone(),
            "outcome" => outcome
        )
        .increment(1);
        metrics::histogram!("relay_attempt_latency_ms", "worker" => record.worker_id.clone())
            .record(record.latency_ms as f64);

        let mut records = self.records.lock();
        records.push_back(record);
        self.prune_locked(&mut records);
    }

    /// Drop records older than the retention window.
    pub fn prune(&self) {
        let mut records = self.records.lock();
        self.prune_locked(&mut records);
    }

    fn prune_locked(&self, records: &mut VecDeque<MetricRecord>) {
        let retention = clock::seconds(self.config.retention_seconds);
        let cutoff = clock::saturating_sub(self.clock.now(), retention);
        while records.front().is_some_and(|r| r.timestamp < cutoff) {
            records.pop_front();
        }
        while records.len() > self.config.max_records {
            records.pop_front();
        }
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> Vec<MetricRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Aggregate retained records by worker, ordered by worker id.
    pub fn summary(&self) -> Vec<WorkerSummary> {
        self.prune();
        let records = self.records.lock();

        let mut by_worker: BTreeMap<&str, WorkerSummary> = BTreeMap::new();
        let mut latency_sums: BTreeMap<&str, u64> = BTreeMap::new();
        for r in records.iter() {
            let entry = by_worker
                .entry(r.worker_id.as_str())
                .or_insert_with(|| WorkerSummary {
                    worker_id: r.worker_id.clone(),
                    attempts: 0,
                    successes: 0,
                    failures: 0,
                    success_rate: 0.0,
                    avg_latency_ms: 0.0,
                    total_cost: 0.0,
                });
            entry.attempts += 1;
            if r.success {
                entry.successes += 1;
            } else {
                entry.failures += 1;
            }
            entry.total_cost += r.cost;
            *latency_sums.entry(r.worker_id.as_str()).or_default() += r.latency_ms as u64;
        }

        by_worker
            .into_iter()
            .map(|(id, mut s)| {
                let attempts = s.attempts as f64;
                s.success_rate = s.successes as f64 / attempts;
                s.avg_latency_ms = latency_sums.get(id).copied().unwrap_or(0) as f64 / attempts;
                s
            })
            .collect()
    }
}
