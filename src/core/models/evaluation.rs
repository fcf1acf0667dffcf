//! Evaluation outcomes: per-limit violations and the aggregate verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::limits::LimitDefinition;

/// One breached limit within an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// The definition that was breached
    pub definition: LimitDefinition,
    /// Usage already consumed inside the window, before this event
    pub current_usage: f64,
    /// `current_usage` plus the event's own contribution
    pub projected_usage: f64,
    /// Ceiling of the breached definition
    pub max_value: f64,
    /// Earliest instant at which the window resets and the quota frees up
    pub retry_at: DateTime<Utc>,
}

impl Violation {
    /// Human-readable denial reason for logs and API responses.
    pub fn reason(&self) -> String {
        format!(
            "{}, current usage: {:.2}, request: {:.2}",
            self.definition,
            self.current_usage,
            self.projected_usage - self.current_usage
        )
    }
}

/// Verdict of checking one candidate event against every applicable limit.
///
/// Violations are ordered by scope precedence (GLOBAL, MODEL, USER,
/// CALLER, PROJECT), then ascending interval unit, so outcomes are
/// reproducible and `first_violation` is a stable single reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// True iff no applicable limit would be breached
    pub allowed: bool,
    /// Every breached limit, never short-circuited
    pub violations: Vec<Violation>,
}

impl EvaluationResult {
    /// Result admitting the event.
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            violations: Vec::new(),
        }
    }

    /// Result from a collected violation list; allowed iff it is empty.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            allowed: violations.is_empty(),
            violations,
        }
    }

    /// The highest-precedence violation, if any.
    pub fn first_violation(&self) -> Option<&Violation> {
        self.violations.first()
    }
}

/// Headroom left under one applicable limit.
#[derive(Debug, Clone, PartialEq)]
pub struct RemainingQuota {
    /// The definition the headroom is measured against
    pub definition: LimitDefinition,
    /// Usage already consumed inside the current window
    pub current_usage: f64,
    /// Amount still available; clamped at zero, infinite for unlimited
    pub remaining: f64,
    /// When the window resets
    pub resets_at: DateTime<Utc>,
}
