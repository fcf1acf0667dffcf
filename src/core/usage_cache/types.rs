//! Usage cache type definitions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::core::models::{LimitDefinition, LimitScope, LimitType};

/// Key identifying one cached aggregation result.
///
/// The window is identified by its start alone. The end of every query is
/// the evaluation instant, so including it would make each lookup unique;
/// the cache TTL bounds how far a reused aggregate may lag behind `now`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
    /// Scope of the limit the aggregate serves
    pub scope: LimitScope,
    /// Exact filter value, `None` for GLOBAL and wildcard aggregates
    pub scope_filter: Option<String>,
    /// Metric being summed
    pub limit_type: LimitType,
    /// Window start, unix seconds
    pub window_start: i64,
}

impl WindowKey {
    /// Key for a definition's aggregate over the window starting at
    /// `window_start`.
    pub fn for_definition(definition: &LimitDefinition, window_start: DateTime<Utc>) -> Self {
        Self {
            scope: definition.scope,
            scope_filter: definition.exact_filter().map(str::to_string),
            limit_type: definition.limit_type,
            window_start: window_start.timestamp(),
        }
    }
}

/// Cached aggregate with its computation timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowEntry {
    /// Aggregate amount
    pub value: f64,
    /// When the aggregate was computed
    pub computed_at: DateTime<Utc>,
}

impl WindowEntry {
    pub fn new(value: f64, computed_at: DateTime<Utc>) -> Self {
        Self { value, computed_at }
    }

    /// Whether the entry may still be served at `now`.
    ///
    /// An entry from the future (clock moved backwards) is treated as
    /// stale rather than served forever.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.computed_at)
            .to_std()
            .is_ok_and(|age| age < ttl)
    }
}

/// Atomic cache statistics for lock-free hot path updates
#[derive(Debug, Default)]
pub struct AtomicCacheStats {
    /// Fresh entries served
    pub hits: AtomicU64,
    /// Lookups that fell through to aggregation
    pub misses: AtomicU64,
    /// Entries dropped by explicit invalidation
    pub invalidations: AtomicU64,
    /// Expired entries removed by pruning
    pub evictions: AtomicU64,
}

impl AtomicCacheStats {
    /// Create a snapshot of current stats
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics snapshot (returned to callers)
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Fresh entries served
    pub hits: u64,
    /// Lookups that fell through to aggregation
    pub misses: u64,
    /// Entries dropped by explicit invalidation
    pub invalidations: u64,
    /// Expired entries removed by pruning
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
