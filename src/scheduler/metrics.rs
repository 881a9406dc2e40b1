//! Queue health metrics

use serde::Serialize;

/// Snapshot returned by [`Scheduler::queue_metrics`](super::Scheduler::queue_metrics).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueMetrics {
    /// Missions waiting (queued or paused)
    pub queue_length: usize,
    pub running: usize,
    /// Mean time queued missions have been waiting, in milliseconds
    pub avg_wait_time_ms: f64,
    /// Completions inside the trailing throughput window
    pub throughput: usize,
    pub throughput_window_seconds: u64,
    /// `rejected / (accepted + rejected)`, 0 when nothing was submitted
    pub rejection_rate: f64,
    pub accepted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

pub(crate) fn rejection_rate(accepted: u64, rejected: u64) -> f64 {
    let total = accepted + rejected;
    if total == 0 {
        0.0
    } else {
        rejected as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_rate() {
        assert_eq!(rejection_rate(0, 0), 0.0);
        assert!((rejection_rate(2, 1) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(rejection_rate(0, 4), 1.0);
    }
}
