//! In-memory usage store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::core::models::{LimitDefinition, LimitType, UsageEvent};
use crate::store::{UsageFilter, UsageStore};
use crate::utils::Result;

/// Usage store keeping definitions and events in process memory.
///
/// Suitable for tests and single-process deployments. History grows
/// unbounded; long-lived deployments should use a persistent backend
/// that prunes aged-out events.
#[derive(Debug, Default)]
pub struct MemoryStore {
    limits: RwLock<Vec<LimitDefinition>>,
    events: RwLock<Vec<UsageEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store preloaded with limit definitions.
    pub fn with_limits(limits: Vec<LimitDefinition>) -> Self {
        Self {
            limits: RwLock::new(limits),
            events: RwLock::new(Vec::new()),
        }
    }

    /// Number of recorded events.
    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn usage_limits(&self) -> Result<Vec<LimitDefinition>> {
        Ok(self.limits.read().clone())
    }

    async fn insert_limit(&self, definition: LimitDefinition) -> Result<()> {
        definition.validate()?;
        self.limits.write().push(definition);
        Ok(())
    }

    async fn sum_usage(
        &self,
        filter: &UsageFilter,
        limit_type: LimitType,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<f64> {
        let events = self.events.read();
        let total = events
            .iter()
            .filter(|event| event.timestamp >= window_start && event.timestamp <= window_end)
            .filter(|event| filter.matches(event))
            .map(|event| limit_type.event_value(event))
            .sum();
        Ok(total)
    }

    async fn record_event(&self, event: &UsageEvent) -> Result<()> {
        debug!("Recording usage event for model {}", event.model);
        self.events.write().push(event.clone());
        Ok(())
    }
}
