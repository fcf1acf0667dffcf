//! Dimension filters for usage aggregation queries

use crate::core::models::{LimitDefinition, LimitScope, UsageEvent};

/// Filter applied when summing recorded usage.
///
/// `None` leaves a dimension unconstrained. A wildcard limit therefore
/// aggregates across every value of its dimension, and a GLOBAL limit
/// across all recorded usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageFilter {
    pub model: Option<String>,
    pub username: Option<String>,
    pub caller: Option<String>,
    pub project: Option<String>,
}

impl UsageFilter {
    /// Builds the filter a definition's aggregation query uses.
    ///
    /// GLOBAL and wildcard definitions constrain nothing; an exact filter
    /// pins its own dimension and leaves the others open.
    pub fn for_definition(definition: &LimitDefinition) -> Self {
        let mut filter = Self::default();
        if let Some(value) = definition.exact_filter() {
            match definition.scope {
                LimitScope::Global => {}
                LimitScope::Model => filter.model = Some(value.to_string()),
                LimitScope::User => filter.username = Some(value.to_string()),
                LimitScope::Caller => filter.caller = Some(value.to_string()),
                LimitScope::Project => filter.project = Some(value.to_string()),
            }
        }
        filter
    }

    /// Whether an event satisfies every pinned dimension.
    pub fn matches(&self, event: &UsageEvent) -> bool {
        self.model.as_ref().is_none_or(|m| *m == event.model)
            && self.username.as_ref().is_none_or(|u| *u == event.username)
            && self.caller.as_ref().is_none_or(|c| *c == event.caller)
            && self
                .project
                .as_ref()
                .is_none_or(|p| event.project.as_ref() == Some(p))
    }

    /// True when no dimension is pinned.
    pub fn is_unconstrained(&self) -> bool {
        self.model.is_none()
            && self.username.is_none()
            && self.caller.is_none()
            && self.project.is_none()
    }
}
