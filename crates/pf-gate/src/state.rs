// state.rs — Per-agent state-freshness cache.
//
// Agents refresh observed world facts through the engine before acting on
// them. The cache keeps only the latest observation per key (last-write-wins,
// no history) and answers freshness queries. Absence and staleness are both
// "not fresh" — the gate layer treats them uniformly as an unsatisfied
// dependency, never as an error.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// The latest observation recorded for one state key.
#[derive(Debug, Clone)]
pub struct StateEntry {
    /// The observed payload. `serde_json::Value` can hold any JSON shape.
    pub value: serde_json::Value,

    /// When the observation was made (UTC).
    pub observed_at: DateTime<Utc>,
}

/// A map from state key to its most recent observation.
///
/// One cache belongs to one agent identity; the engine owns it behind its
/// lock, so this type itself carries no synchronization.
#[derive(Debug, Default)]
pub struct StateCache {
    entries: HashMap<String, StateEntry>,
}

impl StateCache {
    /// Create an empty cache (every key starts out never-observed).
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Record an observation for `key`, unconditionally overwriting any
    /// prior entry.
    pub fn update(&mut self, key: impl Into<String>, value: serde_json::Value, now: DateTime<Utc>) {
        self.entries.insert(
            key.into(),
            StateEntry {
                value,
                observed_at: now,
            },
        );
    }

    /// Whether `key` was observed within `threshold` of `now`.
    ///
    /// Returns false for a key that was never observed. An observation aged
    /// exactly `threshold` is still fresh; only `now - observed_at >
    /// threshold` is stale.
    pub fn is_fresh(&self, key: &str, now: DateTime<Utc>, threshold: Duration) -> bool {
        match self.entries.get(key) {
            Some(entry) => now - entry.observed_at <= threshold,
            None => false,
        }
    }

    /// Whether `key` has ever been observed, fresh or not.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The latest observation for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&StateEntry> {
        self.entries.get(key)
    }

    /// Number of distinct keys observed so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn never_observed_key_is_never_fresh() {
        let cache = StateCache::new();
        assert!(!cache.is_fresh("inventory", t0(), Duration::seconds(30)));
        assert!(!cache.contains("inventory"));
    }

    #[test]
    fn fresh_within_threshold() {
        let mut cache = StateCache::new();
        cache.update("inventory", json!({"sku-1": 40}), t0());

        assert!(cache.is_fresh("inventory", t0(), Duration::seconds(30)));
        assert!(cache.is_fresh(
            "inventory",
            t0() + Duration::seconds(29),
            Duration::seconds(30)
        ));
    }

    #[test]
    fn age_exactly_at_threshold_is_fresh() {
        let mut cache = StateCache::new();
        cache.update("inventory", json!(40), t0());

        assert!(cache.is_fresh(
            "inventory",
            t0() + Duration::seconds(30),
            Duration::seconds(30)
        ));
    }

    #[test]
    fn stale_past_threshold() {
        let mut cache = StateCache::new();
        cache.update("inventory", json!(40), t0());

        assert!(!cache.is_fresh(
            "inventory",
            t0() + Duration::seconds(31),
            Duration::seconds(30)
        ));
        // Stale entries remain in the cache — staleness is a query-time
        // property, not an eviction.
        assert!(cache.contains("inventory"));
    }

    #[test]
    fn update_overwrites_prior_entry() {
        let mut cache = StateCache::new();
        cache.update("balance", json!(100), t0());
        cache.update("balance", json!(75), t0() + Duration::seconds(60));

        let entry = cache.get("balance").unwrap();
        assert_eq!(entry.value, json!(75));
        assert_eq!(entry.observed_at, t0() + Duration::seconds(60));
        assert_eq!(cache.len(), 1);

        // Re-observation restores freshness.
        assert!(cache.is_fresh(
            "balance",
            t0() + Duration::seconds(61),
            Duration::seconds(30)
        ));
    }
}
