//! # llm-accounting-rs
//!
//! Rolling-window quota engine for metered LLM usage. Tracks usage events
//! (requests, tokens, cost) and decides, for each new event, whether it
//! would breach any configured consumption limit.
//!
//! ## Features
//!
//! - **Scoped limits**: GLOBAL, per-model, per-user, per-caller, and
//!   per-project ceilings, with `"*"` wildcards and unlimited allow-list
//!   entries that override a deny-all wildcard
//! - **Rolling and calendar windows**: second/minute/hour windows trail
//!   the current instant; day/week/month windows snap to epoch-anchored
//!   calendar boundaries, so quarterly or bi-weekly quotas stay stable
//! - **Aggregation cache**: window sums are memoized with a TTL and
//!   single-flight recomputation, bounding load on the usage store
//! - **Exact or best-effort enforcement**: a serialized check-and-record
//!   path for strict admission, or pure `check` plus explicit `record`
//!   when throughput matters more
//! - **Pluggable storage**: one async trait over limit definitions and
//!   usage history, with a bundled in-memory backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use llm_accounting_rs::{
//!     LimitDefinition, LimitType, MemoryStore, QuotaEvaluator, TimeInterval, UsageEvent,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let limits = vec![LimitDefinition::global(
//!         LimitType::Requests,
//!         1000.0,
//!         TimeInterval::Day,
//!         1,
//!     )?];
//!     let engine = QuotaEvaluator::new(store, limits, Duration::from_secs(30))?;
//!
//!     let event = UsageEvent::new("gpt-4")
//!         .with_username("alice")
//!         .with_tokens(420)
//!         .with_cost(0.0084);
//!     let result = engine.check_and_record(&event).await?;
//!     if !result.allowed {
//!         for violation in &result.violations {
//!             eprintln!("denied: {}", violation.reason());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Limits can also be declared in YAML, grouped by scope:
//!
//! ```yaml
//! cache_ttl_secs: 30
//! limits:
//!   global:
//!     - limit_type: requests
//!       max_value: 10000
//!       interval_unit: day
//!   models:
//!     - filter: "gpt-4"
//!       limit_type: tokens
//!       max_value: 500000
//!       interval_unit: day
//! ```
//!
//! and loaded with [`LimitsConfig::from_file`], which rejects unknown
//! scopes, metrics, and interval units at the boundary.

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

// Public module exports
pub mod config;
pub mod core;
pub mod store;
pub mod utils;

// Re-export main types
pub use config::LimitsConfig;
pub use core::clock::{Clock, ManualClock, SystemClock};
pub use core::evaluator::QuotaEvaluator;
pub use core::models::{
    EvaluationResult, LimitDefinition, LimitScope, LimitType, RemainingQuota, TimeInterval,
    UsageEvent, Violation,
};
pub use core::usage_cache::CacheStats;
pub use store::{MemoryStore, UsageFilter, UsageStore};
pub use utils::error::{AccountingError, Result};

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
