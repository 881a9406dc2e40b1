//! Per-tenant spend ledger with threshold alerts.
//!
//! Each tenant (workspace) has a tracker holding `total`, `spent` and
//! `remaining = total - spent`. Alert thresholds are ratios of `total`; each
//! one fires at most once, the first time actual or projected spend crosses it.
//! There is no refund operation.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;

use crate::clock::SharedClock;
use crate::config::BudgetConfig;
use crate::events::{EventBus, RelayEvent};

/// Errors from ledger operations.
#[derive(Debug, Error, PartialEq)]
pub enum BudgetError {
    /// Debit or total was negative or not a number
    #[error("Invalid amount for tenant '{tenant}': {amount}")]
    InvalidAmount { tenant: String, amount: f64 },
}

/// One alert threshold and whether it has fired.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertThreshold {
    /// Fraction of `total` (0.0-1.0]
    pub ratio: f64,
    pub triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
}

/// Spend state for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetTracker {
    pub tenant: String,
    pub total: f64,
    pub spent: f64,
    /// Always `total - spent`
    pub remaining: f64,
    /// Ordered ascending by ratio
    pub alert_thresholds: Vec<AlertThreshold>,
    pub updated_at: DateTime<Utc>,
}

impl BudgetTracker {
    fn new(tenant: &str, total: f64, ratios: &[f64], now: DateTime<Utc>) -> Self {
        let mut ratios = ratios.to_vec();
        ratios.sort_by(f64::total_cmp);
        Self {
            tenant: tenant.to_string(),
            total,
            spent: 0.0,
            remaining: total,
            alert_thresholds: ratios
                .into_iter()
                .map(|ratio| AlertThreshold {
                    ratio,
                    triggered: false,
                    triggered_at: None,
                })
                .collect(),
            updated_at: now,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Fraction of the total already spent.
    pub fn usage_ratio(&self) -> f64 {
        if self.total > 0.0 {
            self.spent / self.total
        } else {
            1.0
        }
    }

    /// Mark every untriggered threshold at or below `amount / total` and
    /// return the newly triggered ratios.
    fn cross_thresholds(&mut self, amount: f64, now: DateTime<Utc>) -> Vec<f64> {
        if self.total <= 0.0 {
            return Vec::new();
        }
        let usage = amount / self.total;
        self.alert_thresholds
            .iter_mut()
            .filter(|t| !t.triggered && usage >= t.ratio)
            .map(|t| {
                t.triggered = true;
                t.triggered_at = Some(now);
                t.ratio
            })
            .collect()
    }
}

/// Ledger of all tenants' budgets.
pub struct BudgetLedger {
    trackers: DashMap<String, BudgetTracker>,
    config: BudgetConfig,
    clock: SharedClock,
    events: EventBus,
}

impl BudgetLedger {
    pub fn new(config: BudgetConfig, clock: SharedClock, events: EventBus) -> Self {
        Self {
            trackers: DashMap::new(),
            config,
            clock,
            events,
        }
    }

    fn default_total(&self, tenant: &str) -> f64 {
        self.config
            .tenants
            .get(tenant)
            .copied()
            .unwrap_or(self.config.default_total)
    }

    fn new_tracker(&self, tenant: &str) -> BudgetTracker {
        BudgetTracker::new(
            tenant,
            self.default_total(tenant),
            &self.config.alert_thresholds,
            self.clock.now(),
        )
    }

    /// Snapshot of a tenant's tracker, creating it on first access.
    pub fn get(&self, tenant: &str) -> BudgetTracker {
        self.trackers
            .entry(tenant.to_string())
            .or_insert_with(|| self.new_tracker(tenant))
            .clone()
    }

    pub fn remaining(&self, tenant: &str) -> f64 {
        self.get(tenant).remaining
    }

    /// Replace a tenant's total. Triggered alerts stay triggered.
    pub fn set_total(&self, tenant: &str, total: f64) -> Result<BudgetTracker, BudgetError> {
        if !total.is_finite() || total < 0.0 {
            return Err(BudgetError::InvalidAmount {
                tenant: tenant.to_string(),
                amount: total,
            });
        }
        let now = self.clock.now();
        let mut tracker = self
            .trackers
            .entry(tenant.to_string())
            .or_insert_with(|| self.new_tracker(tenant));
        tracker.total = total;
        tracker.remaining = total - tracker.spent;
        tracker.updated_at = now;
        Ok(tracker.clone())
    }

    /// Record actual spend.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` for negative or non-finite amounts.
    pub fn debit(&self, tenant: &str, amount: f64) -> Result<BudgetTracker, BudgetError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(BudgetError::InvalidAmount {
                tenant: tenant.to_string(),
                amount,
            });
        }

        let now = self.clock.now();
        let (snapshot, fired) = {
            let mut tracker = self
                .trackers
                .entry(tenant.to_string())
                .or_insert_with(|| self.new_tracker(tenant));
            tracker.spent += amount;
            tracker.remaining = tracker.total - tracker.spent;
            tracker.updated_at = now;
            let spent = tracker.spent;
            let fired = tracker.cross_thresholds(spent, now);
            (tracker.clone(), fired)
        };

        metrics::counter!("relay_spend_debits_total").increment(1);
        tracing::debug!(
            tenant,
            amount,
            spent = snapshot.spent,
            remaining = snapshot.remaining,
            "Debited tenant budget"
        );
        self.publish_alerts(&snapshot, snapshot.spent, &fired, false);
        Ok(snapshot)
    }

    /// Fire alerts for thresholds that `spent + estimate` would cross,
    /// without debiting. Returns the ratios that fired.
    pub fn check_projected(&self, tenant: &str, estimate: f64) -> Vec<f64> {
        let now = self.clock.now();
        let (snapshot, projected, fired) = {
            let mut tracker = self
                .trackers
                .entry(tenant.to_string())
                .or_insert_with(|| self.new_tracker(tenant));
            let projected = tracker.spent + estimate.max(0.0);
            let fired = tracker.cross_thresholds(projected, now);
            (tracker.clone(), projected, fired)
        };
        self.publish_alerts(&snapshot, projected, &fired, true);
        fired
    }

    fn publish_alerts(&self, tracker: &BudgetTracker, spent: f64, fired: &[f64], projected: bool) {
        for &threshold in fired {
            tracing::warn!(
                tenant = %tracker.tenant,
                threshold,
                spent,
                total = tracker.total,
                projected,
                "Budget alert threshold crossed"
            );
            metrics::counter!("relay_budget_alerts_total").increment(1);
            self.events.publish(RelayEvent::CostAlert {
                tenant: tracker.tenant.clone(),
                threshold,
                spent,
                total: tracker.total,
                projected,
            });
        }
    }

    /// Snapshots of every known tenant.
    pub fn all(&self) -> Vec<BudgetTracker> {
        let mut trackers: Vec<_> = self.trackers.iter().map(|t| t.clone()).collect();
        trackers.sort_by(|a, b| a.tenant.cmp(&b.tenant));
        trackers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ledger_with(config: BudgetConfig, events: EventBus) -> BudgetLedger {
        BudgetLedger::new(config, Arc::new(ManualClock::new()), events)
    }

    fn ledger() -> BudgetLedger {
        ledger_with(BudgetConfig::default(), EventBus::new())
    }

    #[test]
    fn get_creates_tracker_with_default_total() {
        let ledger = ledger();
        let tracker = ledger.get("acme");
        assert_eq!(tracker.total, BudgetConfig::default().default_total);
        assert_eq!(tracker.spent, 0.0);
        assert_eq!(tracker.remaining, tracker.total);
    }

    #[test]
    fn per_tenant_total_from_config() {
        let config = BudgetConfig {
            tenants: HashMap::from([("small".to_string(), 1.0)]),
            ..Default::default()
        };
        let ledger = ledger_with(config, EventBus::new());
        assert_eq!(ledger.get("small").total, 1.0);
    }

    #[test]
    fn debit_recomputes_remaining() {
        let ledger = ledger();
        ledger.set_total("t", 1.0).unwrap();
        let tracker = ledger.debit("t", 0.25).unwrap();
        assert_eq!(tracker.spent, 0.25);
        assert_eq!(tracker.remaining, 0.75);
    }

    #[test]
    fn debit_rejects_negative_amount() {
        let ledger = ledger();
        assert!(matches!(
            ledger.debit("t", -1.0),
            Err(BudgetError::InvalidAmount { .. })
        ));
        assert!(ledger.debit("t", f64::NAN).is_err());
    }

    #[test]
    fn thresholds_fire_once() {
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let ledger = ledger_with(BudgetConfig::default(), events);
        ledger.set_total("t", 10.0).unwrap();

        ledger.debit("t", 5.0).unwrap();
        ledger.debit("t", 0.1).unwrap();

        let first = rx.try_recv().unwrap();
        assert!(matches!(first, RelayEvent::CostAlert { threshold, .. } if threshold == 0.5));
        assert!(rx.try_recv().is_err());

        let tracker = ledger.get("t");
        assert!(tracker.alert_thresholds[0].triggered);
        assert!(!tracker.alert_thresholds[1].triggered);
    }

    #[test]
    fn single_debit_can_cross_several_thresholds() {
        let ledger = ledger();
        ledger.set_total("t", 1.0).unwrap();
        ledger.debit("t", 0.95).unwrap();
        let tracker = ledger.get("t");
        assert!(tracker.alert_thresholds.iter().all(|t| t.triggered));
    }

    #[test]
    fn projected_check_fires_without_debiting() {
        let ledger = ledger();
        ledger.set_total("t", 1.0).unwrap();

        let fired = ledger.check_projected("t", 0.6);
        assert_eq!(fired, vec![0.5]);
        assert_eq!(ledger.get("t").spent, 0.0);

        // Same threshold never fires again, even from a real debit.
        ledger.debit("t", 0.6).unwrap();
        assert!(ledger.check_projected("t", 0.0).is_empty());
    }

    #[test]
    fn zero_total_is_exhausted() {
        let ledger = ledger();
        let tracker = ledger.set_total("t", 0.0).unwrap();
        assert!(tracker.is_exhausted());
        assert_eq!(tracker.usage_ratio(), 1.0);
    }

    #[test]
    fn thresholds_are_sorted() {
        let config = BudgetConfig {
            alert_thresholds: vec![0.9, 0.5],
            ..Default::default()
        };
        let ledger = ledger_with(config, EventBus::new());
        let ratios: Vec<_> = ledger
            .get("t")
            .alert_thresholds
            .iter()
            .map(|t| t.ratio)
            .collect();
        assert_eq!(ratios, vec![0.5, 0.9]);
    }
}
