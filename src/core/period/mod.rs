//! Window boundary arithmetic
//!
//! Sub-day intervals (second, minute, hour) produce rolling windows that
//! trail the current instant. Day, week, and month intervals snap to
//! calendar boundaries, anchored so that multi-value intervals (every 7
//! days, every 2 weeks, quarterly) stay stable across evaluations instead
//! of drifting with the current date.

mod windows;


pub use windows::{truncate_to_second, window_reset, window_start};
