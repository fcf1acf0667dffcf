//! Error handling for the accounting engine

mod types;


pub use types::{AccountingError, Result};
