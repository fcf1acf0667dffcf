//! Admission decisions against configured limits

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::LimitsConfig;
use crate::core::clock::{Clock, SystemClock};
use crate::core::models::{
    EvaluationResult, LimitDefinition, LimitScope, LimitType, RemainingQuota, UsageEvent,
    Violation, validate_definitions,
};
use crate::core::period;
use crate::core::usage_cache::{CacheStats, UsageCache, WindowKey};
use crate::store::{UsageFilter, UsageStore};
use crate::utils::{AccountingError, Result};

/// Admission engine evaluating usage events against configured limits.
///
/// [`check`](Self::check) is a pure decision and never records the event.
/// Callers running best-effort enforcement record admitted events through
/// [`record`](Self::record), which invalidates the cached aggregates the
/// event touches before returning, so the recording caller reads its own
/// write. [`check_and_record`](Self::check_and_record) serializes the two
/// steps behind a process-wide admission gate, closing the window in which
/// two concurrent events could both claim the last unit of a quota.
pub struct QuotaEvaluator {
    store: Arc<dyn UsageStore>,
    limits: RwLock<Arc<Vec<LimitDefinition>>>,
    cache: UsageCache,
    clock: Arc<dyn Clock>,
    admission_gate: Mutex<()>,
}

impl QuotaEvaluator {
    /// Creates an evaluator over `store` with a validated definition set.
    pub fn new(
        store: Arc<dyn UsageStore>,
        definitions: Vec<LimitDefinition>,
        cache_ttl: Duration,
    ) -> Result<Self> {
        validate_definitions(&definitions)?;
        Ok(Self {
            store,
            limits: RwLock::new(Arc::new(definitions)),
            cache: UsageCache::new(cache_ttl),
            clock: Arc::new(SystemClock),
            admission_gate: Mutex::new(()),
        })
    }

    /// Creates an evaluator whose definition set comes from the store.
    pub async fn from_store(store: Arc<dyn UsageStore>, cache_ttl: Duration) -> Result<Self> {
        let definitions = store.usage_limits().await?;
        Self::new(store, definitions, cache_ttl)
    }

    /// Creates an evaluator from a parsed limits configuration.
    pub fn from_config(store: Arc<dyn UsageStore>, config: &LimitsConfig) -> Result<Self> {
        Self::new(store, config.definitions()?, config.cache_ttl())
    }

    /// Replaces the wall clock, for deterministic tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Decides whether `event` may proceed. Pure: nothing is recorded.
    ///
    /// Violations are collected across every applicable limit rather than
    /// short-circuited, ordered by scope precedence and interval unit, so
    /// callers can report all breached limits at once. A store failure
    /// fails the whole call; no partial result is returned.
    pub async fn check(&self, event: &UsageEvent) -> Result<EvaluationResult> {
        let now = self.clock.now();
        let definitions = self.snapshot();
        let applicable = applicable_in_order(&definitions, event);
        let exemptions = unlimited_exemptions(&applicable);

        let mut violations = Vec::new();
        for definition in applicable {
            if let Err(err) = definition.validate() {
                return Err(AccountingError::Config(format!(
                    "invalid limit definition ({}): {}",
                    definition, err
                )));
            }
            if definition.is_unlimited() {
                continue;
            }
            if definition.is_wildcard()
                && exemptions.contains(&(definition.scope, definition.limit_type))
            {
                debug!(
                    "Skipping wildcard limit ({}) under an unlimited exemption",
                    definition
                );
                continue;
            }

            let window_start =
                period::window_start(now, definition.interval_unit, definition.interval_value)?;
            let current = self.window_usage(definition, window_start, now).await?;

            let contribution = definition.limit_type.event_value(event);
            let projected = current + contribution;
            if round6(projected) > round6(definition.max_value) {
                let retry_at = period::window_reset(
                    window_start,
                    definition.interval_unit,
                    definition.interval_value,
                )?;
                debug!(
                    "Quota violation: {}, current {:.6}, projected {:.6}",
                    definition, current, projected
                );
                violations.push(Violation {
                    definition: definition.clone(),
                    current_usage: current,
                    projected_usage: projected,
                    max_value: definition.max_value,
                    retry_at,
                });
            }
        }

        Ok(EvaluationResult::from_violations(violations))
    }

    /// Records an admitted event and synchronously drops the cached
    /// aggregates its dimensions touch, so the next check on any of them
    /// observes the write. Readers on other dimensions may serve cached
    /// values until their TTL elapses.
    pub async fn record(&self, event: &UsageEvent) -> Result<()> {
        self.store.record_event(event).await?;
        self.invalidate_event(event);
        Ok(())
    }

    /// Checks `event` and records it when admitted, serialized behind a
    /// process-wide admission gate.
    ///
    /// The gate makes admission exact within this process: concurrent
    /// events are decided one at a time against up-to-date aggregates.
    /// Deployments preferring throughput over exactness can call
    /// [`check`](Self::check) and [`record`](Self::record) separately and
    /// accept the check-then-record race.
    pub async fn check_and_record(&self, event: &UsageEvent) -> Result<EvaluationResult> {
        let _gate = self.admission_gate.lock().await;
        let result = self.check(event).await?;
        if result.allowed {
            self.store.record_event(event).await?;
            self.invalidate_event(event);
        }
        Ok(result)
    }

    /// Headroom per applicable limit, in the deterministic check order.
    ///
    /// Unlimited definitions report infinite headroom; exhausted ones
    /// report zero rather than a negative amount.
    pub async fn remaining(&self, event: &UsageEvent) -> Result<Vec<RemainingQuota>> {
        let now = self.clock.now();
        let definitions = self.snapshot();
        let applicable = applicable_in_order(&definitions, event);
        let exemptions = unlimited_exemptions(&applicable);

        let mut quotas = Vec::new();
        for definition in applicable {
            if definition.is_wildcard()
                && exemptions.contains(&(definition.scope, definition.limit_type))
            {
                continue;
            }
            let window_start =
                period::window_start(now, definition.interval_unit, definition.interval_value)?;
            let resets_at = period::window_reset(
                window_start,
                definition.interval_unit,
                definition.interval_value,
            )?;
            let current = self.window_usage(definition, window_start, now).await?;
            let remaining = if definition.is_unlimited() {
                f64::INFINITY
            } else {
                (definition.max_value - current).max(0.0)
            };
            quotas.push(RemainingQuota {
                definition: definition.clone(),
                current_usage: current,
                remaining,
                resets_at,
            });
        }
        Ok(quotas)
    }

    /// Administrative cache reset for one scope/filter slot. Returns the
    /// number of dropped aggregates.
    pub fn invalidate(&self, scope: LimitScope, scope_filter: Option<&str>) -> usize {
        self.cache.invalidate(scope, scope_filter)
    }

    /// Re-reads the definition set from the store.
    pub async fn reload_limits(&self) -> Result<usize> {
        let definitions = self.store.usage_limits().await?;
        self.set_limits(definitions)
    }

    /// Replaces the definition set after validating it.
    ///
    /// Cached aggregates are sums of recorded usage, independent of the
    /// definitions, so they survive a reload.
    pub fn set_limits(&self, definitions: Vec<LimitDefinition>) -> Result<usize> {
        validate_definitions(&definitions)?;
        let count = definitions.len();
        *self.limits.write() = Arc::new(definitions);
        info!("Loaded {} limit definitions", count);
        Ok(count)
    }

    /// Snapshot of the currently active definitions.
    pub fn limit_definitions(&self) -> Arc<Vec<LimitDefinition>> {
        self.snapshot()
    }

    /// Counters for the aggregation cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn snapshot(&self) -> Arc<Vec<LimitDefinition>> {
        self.limits.read().clone()
    }

    /// Current usage for one definition's window, served from the cache.
    async fn window_usage(
        &self,
        definition: &LimitDefinition,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<f64> {
        let key = WindowKey::for_definition(definition, window_start);
        let store = self.store.clone();
        let filter = UsageFilter::for_definition(definition);
        let limit_type = definition.limit_type;
        self.cache
            .get_or_compute(key, now, move || async move {
                store
                    .sum_usage(&filter, limit_type, window_start, now)
                    .await
            })
            .await
    }

    /// Drops the cached aggregates a recorded event contributes to: the
    /// exact slot of each dimension the event carries, the unconstrained
    /// slot of every scope, and the global slot.
    fn invalidate_event(&self, event: &UsageEvent) {
        let mut removed = self.cache.invalidate(LimitScope::Global, None);
        removed += self.cache.invalidate(LimitScope::Model, Some(&event.model));
        removed += self.cache.invalidate(LimitScope::Model, None);
        removed += self
            .cache
            .invalidate(LimitScope::User, Some(&event.username));
        removed += self.cache.invalidate(LimitScope::User, None);
        removed += self
            .cache
            .invalidate(LimitScope::Caller, Some(&event.caller));
        removed += self.cache.invalidate(LimitScope::Caller, None);
        if let Some(project) = event.project.as_deref() {
            removed += self.cache.invalidate(LimitScope::Project, Some(project));
        }
        removed += self.cache.invalidate(LimitScope::Project, None);
        if removed > 0 {
            debug!("Dropped {} cached aggregates after recording", removed);
        }
    }
}

/// Applicable definitions in the deterministic evaluation order: scope
/// precedence, then interval unit, with the filter value as a final
/// tiebreak.
fn applicable_in_order<'a>(
    definitions: &'a [LimitDefinition],
    event: &UsageEvent,
) -> Vec<&'a LimitDefinition> {
    let mut applicable: Vec<&LimitDefinition> = definitions
        .iter()
        .filter(|definition| definition.applies_to(event))
        .collect();
    applicable.sort_by(|a, b| {
        a.ordering_key()
            .cmp(&b.ordering_key())
            .then_with(|| a.scope_filter.cmp(&b.scope_filter))
    });
    applicable
}

/// Scope/metric pairs where an exact-filter unlimited definition matches
/// the event. Wildcard limits of the same pair are skipped, so an
/// allow-list entry overrides a deny-all wildcard regardless of
/// declaration order.
fn unlimited_exemptions(applicable: &[&LimitDefinition]) -> HashSet<(LimitScope, LimitType)> {
    applicable
        .iter()
        .filter(|definition| definition.is_unlimited() && definition.exact_filter().is_some())
        .map(|definition| (definition.scope, definition.limit_type))
        .collect()
}

/// Six decimal places of precision, so accumulated floating point error
/// cannot flip an admit/deny decision.
fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
