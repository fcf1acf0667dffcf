//! Aggregation result cache with TTL and single-flight misses

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::models::LimitScope;
use crate::core::usage_cache::types::{AtomicCacheStats, CacheStats, WindowEntry, WindowKey};
use crate::utils::Result;

/// Memoizes window aggregates keyed by [`WindowKey`].
///
/// Entries are served until their TTL elapses or they are invalidated.
/// Concurrent misses on one key are collapsed behind a per-key gate so the
/// backing store sees a single aggregation query. A zero TTL disables the
/// cache: every lookup recomputes, which restores read-your-writes
/// behavior at full aggregation cost.
#[derive(Debug)]
pub struct UsageCache {
    entries: DashMap<WindowKey, WindowEntry>,
    inflight: DashMap<WindowKey, Arc<Mutex<()>>>,
    ttl: Duration,
    stats: AtomicCacheStats,
}

impl UsageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            ttl,
            stats: AtomicCacheStats::default(),
        }
    }

    /// Configured entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached aggregate for `key`, computing it when absent
    /// or stale.
    ///
    /// `now` is the evaluation instant; freshness is judged against it so
    /// callers with an injected clock get deterministic behavior. A failed
    /// computation caches nothing.
    ///
    /// Misses are single-flight per key: only the task holding the permit
    /// of the currently registered gate may compute, and the gate is
    /// retired before that permit is released. A task that wakes under a
    /// retired gate starts over against the current registration, so two
    /// computations for one key can never overlap.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: WindowKey,
        now: DateTime<Utc>,
        compute: F,
    ) -> Result<f64>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<f64>>,
    {
        if self.ttl.is_zero() {
            return compute().await;
        }

        let (gate, permit) = loop {
            if let Some(entry) = self.entries.get(&key) {
                if entry.is_fresh(now, self.ttl) {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("Usage cache hit for {:?}", key);
                    return Ok(entry.value);
                }
            }

            let gate = self
                .inflight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value()
                .clone();
            let permit = gate.clone().lock_owned().await;

            // The gate may have been retired while we waited on it; its
            // permit then grants nothing.
            let registered = self
                .inflight
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current.value(), &gate));
            if registered {
                break (gate, permit);
            }
            drop(permit);
        };

        // A task that held the gate first may have filled the entry while
        // we waited.
        if let Some(entry) = self.entries.get(&key) {
            if entry.is_fresh(now, self.ttl) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                let value = entry.value;
                drop(entry);
                self.retire_gate(&key, &gate);
                drop(permit);
                return Ok(value);
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Usage cache miss for {:?}", key);
        let computed = compute().await;
        if let Ok(value) = &computed {
            self.entries.insert(key.clone(), WindowEntry::new(*value, now));
            if self.entries.len().is_multiple_of(512) {
                self.prune_expired(now);
            }
        }

        self.retire_gate(&key, &gate);
        drop(permit);
        computed
    }

    /// Deregisters `gate` when it is still the one registered for `key`,
    /// leaving another task's registration alone. Must be called while
    /// the gate's permit is held, so waiters can never find it registered
    /// after the holder is done with it.
    fn retire_gate(&self, key: &WindowKey, gate: &Arc<Mutex<()>>) {
        self.inflight
            .remove_if(key, |_, current| Arc::ptr_eq(current, gate));
    }

    /// Drops every entry whose key matches `scope` and `scope_filter`
    /// exactly, across all metrics and windows. Returns the number of
    /// entries removed.
    pub fn invalidate(&self, scope: LimitScope, scope_filter: Option<&str>) -> usize {
        let mut removed = 0usize;
        self.entries.retain(|key, _| {
            if key.scope == scope && key.scope_filter.as_deref() == scope_filter {
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed > 0 {
            self.stats
                .invalidations
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(
                "Invalidated {} usage cache entries for {} scope",
                removed, scope
            );
        }
        removed
    }

    /// Drops every cached aggregate.
    pub fn invalidate_all(&self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        if removed > 0 {
            self.stats
                .invalidations
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Removes entries that are no longer fresh at `now`, and miss gates
    /// no task holds anymore. Returns the number of entries removed.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let mut removed = 0usize;
        self.entries.retain(|_, entry| {
            if entry.is_fresh(now, ttl) {
                true
            } else {
                removed += 1;
                false
            }
        });
        // A gate with no clones outside the map belongs to a task that was
        // dropped mid-wait; nothing is left to retire it.
        self.inflight.retain(|_, gate| Arc::strong_count(gate) > 1);
        if removed > 0 {
            self.stats
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!("Pruned {} expired usage cache entries", removed);
        }
        removed
    }

    /// Snapshot of hit/miss/invalidation/eviction counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of miss gates currently registered.
    #[cfg(test)]
    pub(crate) fn inflight_gates(&self) -> usize {
        self.inflight.len()
    }
}
