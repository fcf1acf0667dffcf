//! Limit configuration structures

use serde::{Deserialize, Serialize};

use crate::core::models::{LimitType, TimeInterval};

fn default_interval_value() -> u32 {
    1
}

/// Limit declarations grouped by the scope they bind to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitGroups {
    /// Limits on all usage regardless of dimension
    #[serde(default)]
    pub global: Vec<GlobalLimitEntry>,
    /// Per-model limits
    #[serde(default)]
    pub models: Vec<ScopedLimitEntry>,
    /// Per-user limits
    #[serde(default)]
    pub users: Vec<ScopedLimitEntry>,
    /// Per-caller limits
    #[serde(default)]
    pub callers: Vec<ScopedLimitEntry>,
    /// Per-project limits
    #[serde(default)]
    pub projects: Vec<ScopedLimitEntry>,
}

impl LimitGroups {
    /// Total number of declarations across all groups.
    pub fn len(&self) -> usize {
        self.global.len()
            + self.models.len()
            + self.users.len()
            + self.callers.len()
            + self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One GLOBAL limit declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalLimitEntry {
    /// Metric being bounded
    pub limit_type: LimitType,
    /// Ceiling; `-1` means unlimited
    pub max_value: f64,
    /// Window unit
    pub interval_unit: TimeInterval,
    /// Window multiplier, defaults to 1
    #[serde(default = "default_interval_value")]
    pub interval_value: u32,
}

/// One scoped limit declaration.
///
/// `filter` is the dimension value the limit binds to, or `"*"` to match
/// every value of the dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopedLimitEntry {
    /// Dimension value or `"*"`
    pub filter: String,
    /// Metric being bounded
    pub limit_type: LimitType,
    /// Ceiling; `-1` means unlimited
    pub max_value: f64,
    /// Window unit
    pub interval_unit: TimeInterval,
    /// Window multiplier, defaults to 1
    #[serde(default = "default_interval_value")]
    pub interval_value: u32,
}
