//! Usage storage backends
//!
//! The evaluation engine reads limit definitions and aggregates recorded
//! usage through the [`UsageStore`] trait. [`MemoryStore`] is the bundled
//! in-process backend; persistent backends implement the same trait.

/// Aggregation query filters
mod filter;
/// In-memory backend
mod memory;
/// Storage trait
mod traits;


pub use filter::UsageFilter;
pub use memory::MemoryStore;
pub use traits::UsageStore;
