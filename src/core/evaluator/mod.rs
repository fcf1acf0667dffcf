//! Quota evaluation engine
//!
//! Orchestrates the admission decision: resolve the limits applicable to
//! an event, aggregate current usage per window through the cache, project
//! the event's contribution, and collect every violated limit into one
//! result.

mod evaluator;


pub use evaluator::QuotaEvaluator;
