//! Worker scoring shared by the router and the scheduler

use std::sync::Arc;

use crate::catalog::{Tier, TokenEstimate, Worker};
use crate::config::{DomainProfile, ScoringConfig};
use crate::request::Priority;

/// Request attributes that influence scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreContext {
    pub priority: Priority,
    pub profile: DomainProfile,
    pub tokens: TokenEstimate,
}

/// A candidate and its score.
#[derive(Debug, Clone)]
pub struct Scored {
    pub worker: Arc<Worker>,
    pub score: f64,
    pub estimated_cost: f64,
}

/// Score a worker for a request. Higher is better.
///
/// ```text
/// tier base
///   - cost_estimate * cost_weight
///   - avg_latency_ms / latency_divisor
///   + priority bonus
///   + domain bonus
/// ```
pub fn score(worker: &Worker, ctx: &ScoreContext, config: &ScoringConfig) -> f64 {
    let base = match worker.tier {
        Tier::Quality => config.tier_base.quality,
        Tier::Balanced => config.tier_base.balanced,
        Tier::Fast => config.tier_base.fast,
    };

    let cost_penalty = worker.cost_estimate(ctx.tokens) * config.cost_weight;
    let latency = worker.avg_latency_ms();
    let latency_penalty = latency as f64 / config.latency_divisor;

    let bonuses = &config.priority_bonus;
    let priority_bonus = match (ctx.priority, worker.tier) {
        (Priority::Critical, Tier::Quality) => bonuses.critical_quality,
        (Priority::High, Tier::Quality) => bonuses.high_quality,
        (Priority::Low, Tier::Fast) => bonuses.low_fast,
        _ => 0.0,
    };

    let domain = &config.domain_bonus;
    let domain_bonus = match ctx.profile {
        DomainProfile::LatencySensitive if latency < domain.latency_threshold_ms => {
            domain.latency_bonus
        }
        DomainProfile::QualitySensitive if worker.tier == Tier::Quality => domain.quality_bonus,
        _ => 0.0,
    };

    base - cost_penalty - latency_penalty + priority_bonus + domain_bonus
}

/// Score every candidate and sort descending.
///
/// The sort is stable, so equal scores keep their catalog order.
pub fn rank(candidates: Vec<Arc<Worker>>, ctx: &ScoreContext, config: &ScoringConfig) -> Vec<Scored> {
    let mut scored: Vec<Scored> = candidates
        .into_iter()
        .map(|worker| Scored {
            score: score(&worker, ctx, config),
            estimated_cost: worker.cost_estimate(ctx.tokens),
            worker,
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    for s in &scored {
        tracing::debug!(worker_id = %s.worker.id, score = s.score, cost = s.estimated_cost, "Scored candidate");
    }
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CostModel;

    fn flat(id: &str, tier: Tier, per_call: f64, latency: u32) -> Arc<Worker> {
        Arc::new(
            Worker::new(id, "test", tier, CostModel::Flat { per_call })
                .with_performance(latency, latency * 2),
        )
    }

    fn ctx(priority: Priority, profile: DomainProfile) -> ScoreContext {
        ScoreContext {
            priority,
            profile,
            tokens: TokenEstimate::default(),
        }
    }

    #[test]
    fn test_score_formula() {
        let config = ScoringConfig::default();
        let w = flat("q", Tier::Quality, 0.5, 200);
        // 100 - 0.5*10 - 200/100
        let s = score(&w, &ctx(Priority::Normal, DomainProfile::Neutral), &config);
        assert!((s - 93.0).abs() < 1e-9);
    }

    #[test]
    fn test_critical_priority_favors_quality_tier() {
        let config = ScoringConfig::default();
        let q = flat("q", Tier::Quality, 0.0, 0);
        let normal = score(&q, &ctx(Priority::Normal, DomainProfile::Neutral), &config);
        let critical = score(&q, &ctx(Priority::Critical, DomainProfile::Neutral), &config);
        assert!((critical - normal - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_low_priority_favors_fast_tier() {
        let config = ScoringConfig::default();
        let fast = flat("f", Tier::Fast, 0.0, 0);
        let s = score(&fast, &ctx(Priority::Low, DomainProfile::Neutral), &config);
        assert!((s - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_latency_sensitive_domain_bonus() {
        let config = ScoringConfig::default();
        let quick = flat("quick", Tier::Fast, 0.0, 500);
        let slow = flat("slow", Tier::Fast, 0.0, 1500);
        let c = ctx(Priority::Normal, DomainProfile::LatencySensitive);
        assert!((score(&quick, &c, &config) - (60.0 - 5.0 + 15.0)).abs() < 1e-9);
        assert!((score(&slow, &c, &config) - (60.0 - 15.0)).abs() < 1e-9);
    }

    #[test]
    fn test_quality_sensitive_domain_bonus() {
        let config = ScoringConfig::default();
        let q = flat("q", Tier::Quality, 0.0, 0);
        let b = flat("b", Tier::Balanced, 0.0, 0);
        let c = ctx(Priority::Normal, DomainProfile::QualitySensitive);
        assert!((score(&q, &c, &config) - 115.0).abs() < 1e-9);
        assert!((score(&b, &c, &config) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let config = ScoringConfig::default();
        let workers = vec![
            flat("first", Tier::Balanced, 0.1, 100),
            flat("best", Tier::Quality, 0.1, 100),
            flat("second", Tier::Balanced, 0.1, 100),
            flat("third", Tier::Balanced, 0.1, 100),
        ];
        let ranked = rank(workers, &ctx(Priority::Normal, DomainProfile::Neutral), &config);
        let ids: Vec<_> = ranked.iter().map(|s| s.worker.id.as_str()).collect();
        assert_eq!(ids, vec!["best", "first", "second", "third"]);
    }

    #[test]
    fn test_rank_records_cost_estimate() {
        let config = ScoringConfig::default();
        let ranked = rank(
            vec![flat("a", Tier::Fast, 0.25, 100)],
            &ctx(Priority::Normal, DomainProfile::Neutral),
            &config,
        );
        assert_eq!(ranked[0].estimated_cost, 0.25);
    }
}
