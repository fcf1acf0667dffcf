//! Error types for the accounting engine

use thiserror::Error;

/// Result type alias for the accounting engine
pub type Result<T> = std::result::Result<T, AccountingError>;

/// Main error type for the accounting engine
#[derive(Error, Debug)]
pub enum AccountingError {
    /// Configuration errors (malformed files, duplicate or invalid limit definitions)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (bad arguments reaching the evaluation path)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Usage store errors (backend unavailable, query failed or timed out)
    #[error("Usage store error: {0}")]
    Store(String),
}

impl AccountingError {
    /// True when the error means the usage store could not answer.
    ///
    /// Callers must treat this as "unknown", never as "allowed".
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, AccountingError::Store(_))
    }
}
