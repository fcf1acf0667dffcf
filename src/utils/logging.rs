//! Structured logging setup
//!
//! The engine itself only emits `tracing` events; embedders that do not
//! install their own subscriber can call one of these initializers.

use tracing_subscriber::EnvFilter;

/// Initialize logging from the `RUST_LOG` environment variable.
///
/// Falls back to `info` when the variable is unset or unparsable.
pub fn init() {
    init_with_filter("info");
}

/// Initialize logging with an explicit default filter directive.
///
/// `RUST_LOG` still takes precedence when set. Safe to call more than
/// once; subsequent calls are no-ops.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .try_init();
}

/// Initialize JSON-formatted logging for log-aggregated deployments.
pub fn init_json() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .try_init();
}
