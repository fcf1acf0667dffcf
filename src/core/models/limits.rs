//! Limit definitions: scopes, bounded quantities and time windows.

use crate::utils::error::{AccountingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::usage::UsageEvent;

/// Dimension a quota applies to.
///
/// Declaration order is the evaluation precedence used when ordering
/// violations, so keep it stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitScope {
    /// Applies to all usage regardless of attribution
    Global,
    /// Applies to usage of one model (or any model, with the wildcard filter)
    Model,
    /// Applies to usage attributed to one username
    User,
    /// Applies to usage attributed to one calling application
    Caller,
    /// Applies to usage attributed to one project
    Project,
}

impl LimitScope {
    /// Name of the event dimension this scope binds to, for messages.
    pub fn dimension(&self) -> &'static str {
        match self {
            LimitScope::Global => "global",
            LimitScope::Model => "model",
            LimitScope::User => "user",
            LimitScope::Caller => "caller",
            LimitScope::Project => "project",
        }
    }
}

impl fmt::Display for LimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LimitScope::Global => "GLOBAL",
            LimitScope::Model => "MODEL",
            LimitScope::User => "USER",
            LimitScope::Caller => "CALLER",
            LimitScope::Project => "PROJECT",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for LimitScope {
    type Err = AccountingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(LimitScope::Global),
            "model" => Ok(LimitScope::Model),
            "user" => Ok(LimitScope::User),
            "caller" => Ok(LimitScope::Caller),
            "project" => Ok(LimitScope::Project),
            other => Err(AccountingError::Config(format!(
                "unrecognized limit scope: {}",
                other
            ))),
        }
    }
}

/// Quantity a limit bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    /// Number of usage events
    Requests,
    /// Tokens consumed
    Tokens,
    /// Monetary cost
    Cost,
}

impl LimitType {
    /// Contribution of a single event toward this quantity.
    pub fn event_value(&self, event: &UsageEvent) -> f64 {
        match self {
            LimitType::Requests => 1.0,
            LimitType::Tokens => event.tokens as f64,
            LimitType::Cost => event.cost,
        }
    }
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LimitType::Requests => "requests",
            LimitType::Tokens => "tokens",
            LimitType::Cost => "cost",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for LimitType {
    type Err = AccountingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "requests" => Ok(LimitType::Requests),
            "tokens" => Ok(LimitType::Tokens),
            "cost" => Ok(LimitType::Cost),
            other => Err(AccountingError::Config(format!(
                "unrecognized limit type: {}",
                other
            ))),
        }
    }
}

/// Unit of a limit's time window.
///
/// Sub-day units produce rolling windows; day and above snap to calendar
/// boundaries. Declaration order is ascending duration, which drives the
/// deterministic violation ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInterval {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl TimeInterval {
    /// True for units whose window slides continuously with `now`.
    pub fn is_rolling(&self) -> bool {
        matches!(
            self,
            TimeInterval::Second | TimeInterval::Minute | TimeInterval::Hour
        )
    }

    /// Nominal seconds per unit. Exact for the rolling units; months count
    /// as 30 days, so calendar math must not rely on this.
    pub fn nominal_secs(&self) -> i64 {
        match self {
            TimeInterval::Second => 1,
            TimeInterval::Minute => 60,
            TimeInterval::Hour => 3_600,
            TimeInterval::Day => 86_400,
            TimeInterval::Week => 604_800,
            TimeInterval::Month => 2_592_000,
        }
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeInterval::Second => "second",
            TimeInterval::Minute => "minute",
            TimeInterval::Hour => "hour",
            TimeInterval::Day => "day",
            TimeInterval::Week => "week",
            TimeInterval::Month => "month",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TimeInterval {
    type Err = AccountingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "second" => Ok(TimeInterval::Second),
            "minute" => Ok(TimeInterval::Minute),
            "hour" => Ok(TimeInterval::Hour),
            "day" => Ok(TimeInterval::Day),
            "week" => Ok(TimeInterval::Week),
            "month" => Ok(TimeInterval::Month),
            other => Err(AccountingError::Config(format!(
                "unrecognized time interval: {}",
                other
            ))),
        }
    }
}

/// A configured quota: one bounded quantity over one scope and window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitDefinition {
    /// Dimension the limit restricts
    pub scope: LimitScope,
    /// Concrete value the scope binds to; `None` for GLOBAL, `"*"` for any
    #[serde(default)]
    pub scope_filter: Option<String>,
    /// Quantity being bounded
    pub limit_type: LimitType,
    /// Ceiling; usage may equal it but not exceed it. `-1` means unlimited.
    pub max_value: f64,
    /// Window unit
    pub interval_unit: TimeInterval,
    /// Positive multiplier on the unit
    pub interval_value: u32,
}

impl LimitDefinition {
    /// Filter value matching any value of the scope's dimension.
    pub const WILDCARD: &'static str = "*";

    /// Sentinel ceiling for definitions that never violate.
    pub const UNLIMITED: f64 = -1.0;

    /// Build a definition, rejecting malformed combinations.
    pub fn new(
        scope: LimitScope,
        scope_filter: Option<String>,
        limit_type: LimitType,
        max_value: f64,
        interval_unit: TimeInterval,
        interval_value: u32,
    ) -> Result<Self> {
        let definition = Self {
            scope,
            scope_filter,
            limit_type,
            max_value,
            interval_unit,
            interval_value,
        };
        definition.validate()?;
        Ok(definition)
    }

    /// Shorthand for a GLOBAL definition.
    pub fn global(
        limit_type: LimitType,
        max_value: f64,
        interval_unit: TimeInterval,
        interval_value: u32,
    ) -> Result<Self> {
        Self::new(
            LimitScope::Global,
            None,
            limit_type,
            max_value,
            interval_unit,
            interval_value,
        )
    }

    /// Shorthand for a non-GLOBAL definition bound to `scope_filter`.
    pub fn scoped(
        scope: LimitScope,
        scope_filter: impl Into<String>,
        limit_type: LimitType,
        max_value: f64,
        interval_unit: TimeInterval,
        interval_value: u32,
    ) -> Result<Self> {
        Self::new(
            scope,
            Some(scope_filter.into()),
            limit_type,
            max_value,
            interval_unit,
            interval_value,
        )
    }

    /// Check field-level invariants.
    pub fn validate(&self) -> Result<()> {
        if self.interval_value == 0 {
            return Err(AccountingError::Config(format!(
                "interval_value must be positive in limit definition: {}",
                self
            )));
        }
        if !self.max_value.is_finite() {
            return Err(AccountingError::Config(format!(
                "max_value must be finite in limit definition: {}",
                self
            )));
        }
        if self.max_value < 0.0 && self.max_value != Self::UNLIMITED {
            return Err(AccountingError::Config(format!(
                "max_value must be non-negative or the unlimited sentinel (-1) \
                 in limit definition: {}",
                self
            )));
        }
        match (self.scope, &self.scope_filter) {
            (LimitScope::Global, Some(_)) => Err(AccountingError::Config(format!(
                "GLOBAL limits must not carry a scope filter: {}",
                self
            ))),
            (LimitScope::Global, None) => Ok(()),
            (_, None) => Err(AccountingError::Config(format!(
                "{} limits require a scope filter: {}",
                self.scope, self
            ))),
            (_, Some(filter)) if filter.trim().is_empty() => Err(AccountingError::Config(
                format!("scope filter must not be blank: {}", self),
            )),
            (_, Some(_)) => Ok(()),
        }
    }

    /// True when the ceiling is the unlimited sentinel.
    pub fn is_unlimited(&self) -> bool {
        self.max_value == Self::UNLIMITED
    }

    /// True when the filter matches any value of the dimension.
    pub fn is_wildcard(&self) -> bool {
        self.scope_filter.as_deref() == Some(Self::WILDCARD)
    }

    /// The filter value when it pins a single dimension value, `None` for
    /// GLOBAL and wildcard definitions.
    pub fn exact_filter(&self) -> Option<&str> {
        self.scope_filter
            .as_deref()
            .filter(|filter| *filter != Self::WILDCARD)
    }

    /// Whether this definition constrains the given event.
    ///
    /// GLOBAL applies to everything. The wildcard filter matches any value
    /// of the dimension; for PROJECT that still requires the event to carry
    /// a project. An exact filter requires equality.
    pub fn applies_to(&self, event: &UsageEvent) -> bool {
        let filter = match (self.scope, self.scope_filter.as_deref()) {
            (LimitScope::Global, _) => return true,
            (_, Some(filter)) => filter,
            // Unvalidated definition; nothing sensible to match.
            (_, None) => return false,
        };
        match self.scope {
            LimitScope::Global => true,
            LimitScope::Model => filter == Self::WILDCARD || filter == event.model,
            LimitScope::User => filter == Self::WILDCARD || filter == event.username,
            LimitScope::Caller => filter == Self::WILDCARD || filter == event.caller,
            LimitScope::Project => match event.project.as_deref() {
                Some(project) => filter == Self::WILDCARD || filter == project,
                None => false,
            },
        }
    }

    /// Identity under the uniqueness invariant: no two definitions may
    /// share it with different ceilings.
    pub fn identity(&self) -> (LimitScope, Option<&str>, LimitType, TimeInterval, u32) {
        (
            self.scope,
            self.scope_filter.as_deref(),
            self.limit_type,
            self.interval_unit,
            self.interval_value,
        )
    }

    /// Key producing the deterministic evaluation and reporting order:
    /// scope precedence first, then ascending interval unit within a scope.
    pub fn ordering_key(&self) -> (LimitScope, TimeInterval, u32, LimitType) {
        (
            self.scope,
            self.interval_unit,
            self.interval_value,
            self.limit_type,
        )
    }
}

impl fmt::Display for LimitDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.interval_value > 1 { "s" } else { "" };
        match &self.scope_filter {
            Some(filter) => write!(
                f,
                "{} ({}: {}) limit: {:.2} {} per {} {}{}",
                self.scope,
                self.scope.dimension(),
                filter,
                self.max_value,
                self.limit_type,
                self.interval_value,
                self.interval_unit,
                plural
            ),
            None => write!(
                f,
                "{} limit: {:.2} {} per {} {}{}",
                self.scope,
                self.max_value,
                self.limit_type,
                self.interval_value,
                self.interval_unit,
                plural
            ),
        }
    }
}

/// Validate a whole definition set: every definition well-formed and the
/// (scope, filter, type, window) identity unique across the set.
pub fn validate_definitions(definitions: &[LimitDefinition]) -> Result<()> {
    let mut seen = HashSet::new();
    for definition in definitions {
        definition.validate()?;
        if !seen.insert(definition.identity()) {
            return Err(AccountingError::Config(format!(
                "duplicate limit definition: {}",
                definition
            )));
        }
    }
    Ok(())
}
