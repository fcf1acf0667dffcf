//! TTL cache for window aggregation results
//!
//! Summing usage history is the expensive step of every quota check, so
//! aggregates are memoized per (scope, filter, metric, window start) with
//! a short TTL. Concurrent misses on the same key are collapsed into a
//! single aggregation; recording an event invalidates the entries its
//! dimensions touch.

mod cache;
mod types;


pub use cache::UsageCache;
pub use types::{CacheStats, WindowEntry, WindowKey};
