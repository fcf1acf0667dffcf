//! Core data models for the accounting engine
//!
//! Limit definitions, usage events and evaluation outcomes.

pub mod evaluation;
pub mod limits;
pub mod usage;


// Re-export commonly used types
pub use evaluation::{EvaluationResult, RemainingQuota, Violation};
pub use limits::{LimitDefinition, LimitScope, LimitType, TimeInterval, validate_definitions};
pub use usage::UsageEvent;
