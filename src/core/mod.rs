//! Core quota evaluation functionality
//!
//! This module contains the evaluation engine and the pieces it is built
//! from: the data model, window arithmetic, the aggregation cache, and the
//! clock abstraction.

pub mod clock;
pub mod evaluator;
pub mod models;
pub mod period;
pub mod usage_cache;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use evaluator::QuotaEvaluator;
pub use models::{
    EvaluationResult, LimitDefinition, LimitScope, LimitType, RemainingQuota, TimeInterval,
    UsageEvent, Violation,
};
pub use usage_cache::{CacheStats, UsageCache, WindowKey};
