//! Response cache keyed by request shape.
//!
//! Entries expire lazily on lookup; [`ResponseCache::purge_expired`] sweeps
//! the rest.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use crate::clock::SharedClock;
use crate::request::Constraints;
use crate::routing::decision::ExecutionResult;

/// Hash of `(domain, task, constraints)`.
///
/// Floats are hashed by bit pattern and capabilities in sorted order, so
/// equal constraints always produce the same key.
pub fn cache_key(domain: &str, task: &str, constraints: &Constraints) -> u64 {
    let mut hasher = DefaultHasher::new();
    domain.hash(&mut hasher);
    task.hash(&mut hasher);
    constraints.max_cost.map(f64::to_bits).hash(&mut hasher);
    constraints.max_latency_ms.hash(&mut hasher);
    constraints.min_quality.map(f64::to_bits).hash(&mut hasher);
    let mut capabilities: Vec<&str> = constraints
        .required_capabilities
        .iter()
        .map(String::as_str)
        .collect();
    capabilities.sort_unstable();
    capabilities.dedup();
    capabilities.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: ExecutionResult,
    expires_at: DateTime<Utc>,
}

pub struct ResponseCache {
    entries: DashMap<u64, CacheEntry>,
    clock: SharedClock,
}

impl ResponseCache {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Live entry for the key; an expired entry is removed and reported as a miss.
    pub fn get(&self, key: u64) -> Option<ExecutionResult> {
        let now = self.clock.now();
        {
            let entry = self.entries.get(&key)?;
            if entry.expires_at > now {
                return Some(entry.result.clone());
            }
        }
        self.entries.remove_if(&key, |_, e| e.expires_at <= now);
        None
    }

    pub fn insert(&self, key: u64, result: ExecutionResult, ttl: Duration) {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(key, CacheEntry { result, expires_at });
    }

    pub fn remove(&self, key: u64) {
        self.entries.remove(&key);
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentOutput;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn result(worker_id: &str) -> ExecutionResult {
        ExecutionResult {
            worker_id: worker_id.to_string(),
            output: AgentOutput::new(serde_json::json!({"text": "hi"}), 0.01),
            latency_ms: 12,
            attempts: vec![],
            from_cache: false,
        }
    }

    #[test]
    fn test_key_ignores_capability_order() {
        let a = Constraints {
            required_capabilities: vec!["code".into(), "chat".into()],
            ..Default::default()
        };
        let b = Constraints {
            required_capabilities: vec!["chat".into(), "code".into()],
            ..Default::default()
        };
        assert_eq!(cache_key("d", "t", &a), cache_key("d", "t", &b));
    }

    #[test]
    fn test_key_distinguishes_constraints() {
        let loose = Constraints::default();
        let tight = Constraints {
            max_cost: Some(0.1),
            ..Default::default()
        };
        assert_ne!(cache_key("d", "t", &loose), cache_key("d", "t", &tight));
        assert_ne!(cache_key("d", "t", &loose), cache_key("d", "u", &loose));
    }

    #[test]
    fn test_entry_expires_lazily() {
        let clock = ManualClock::new();
        let cache = ResponseCache::new(Arc::new(clock.clone()));
        cache.insert(1, result("w"), Duration::from_secs(60));

        assert_eq!(cache.get(1).map(|r| r.worker_id), Some("w".to_string()));
        clock.advance(chrono::Duration::seconds(60));
        assert!(cache.get(1).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let clock = ManualClock::new();
        let cache = ResponseCache::new(Arc::new(clock.clone()));
        cache.insert(1, result("a"), Duration::from_secs(10));
        cache.insert(2, result("b"), Duration::from_secs(100));

        clock.advance(chrono::Duration::seconds(11));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(2).is_some());
    }
}
