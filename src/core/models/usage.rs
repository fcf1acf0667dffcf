//! Usage events: the unit of metered consumption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One metered usage event, candidate or historical.
///
/// Immutable once recorded. `username` and `caller` default to empty
/// strings for unattributed usage; `project` is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Model the usage was billed against
    pub model: String,
    /// User the usage is attributed to, empty when unattributed
    #[serde(default)]
    pub username: String,
    /// Calling application, empty when unattributed
    #[serde(default)]
    pub caller: String,
    /// Project the usage belongs to, if any
    #[serde(default)]
    pub project: Option<String>,
    /// Tokens consumed
    #[serde(default)]
    pub tokens: u64,
    /// Monetary cost
    #[serde(default)]
    pub cost: f64,
    /// When the usage happened
    pub timestamp: DateTime<Utc>,
}

impl UsageEvent {
    /// New event for `model`, timestamped now, with everything else empty.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            username: String::new(),
            caller: String::new(),
            project: None,
            tokens: 0,
            cost: 0.0,
            timestamp: Utc::now(),
        }
    }

    /// Attribute the event to a user.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Attribute the event to a calling application.
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = caller.into();
        self
    }

    /// Attribute the event to a project.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set the tokens consumed.
    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens = tokens;
        self
    }

    /// Set the monetary cost.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Override the event timestamp (defaults to construction time).
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
