//! Utility modules for the accounting engine
//!
//! - **error**: Error handling
//! - **logging**: Structured logging setup

pub mod error;
pub mod logging;

pub use error::{AccountingError, Result};
