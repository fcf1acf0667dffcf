//! Storage trait for limit definitions and recorded usage

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::models::{LimitDefinition, LimitType, UsageEvent};
use crate::store::UsageFilter;
use crate::utils::Result;

/// Backend holding limit definitions and the usage history they meter.
///
/// Window bounds on aggregation queries are inclusive at both ends, so an
/// event stamped exactly at the window start still counts toward it. A
/// failed query fails the evaluation that issued it; the engine does not
/// substitute a guess for missing usage data.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Returns every configured limit definition.
    async fn usage_limits(&self) -> Result<Vec<LimitDefinition>>;

    /// Adds a limit definition.
    async fn insert_limit(&self, definition: LimitDefinition) -> Result<()>;

    /// Sums the `limit_type` value of events matching `filter` whose
    /// timestamps fall within `[window_start, window_end]`.
    async fn sum_usage(
        &self,
        filter: &UsageFilter,
        limit_type: LimitType,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<f64>;

    /// Appends a usage event to the history.
    async fn record_event(&self, event: &UsageEvent) -> Result<()>;
}
