//! End-to-end admission flow tests
//!
//! Drive the evaluator the way an embedding gateway would: definitions
//! from YAML or code, checks, recording, reloads and store failures.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use llm_accounting_rs::{
        Clock, LimitDefinition, LimitScope, LimitType, LimitsConfig, ManualClock, MemoryStore,
        QuotaEvaluator, TimeInterval, UsageStore,
    };

    use crate::common::{test_noon, EventFactory, FlakyStore, LimitFactory};

    fn evaluator_over(
        store: Arc<MemoryStore>,
        limits: Vec<LimitDefinition>,
    ) -> (QuotaEvaluator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(test_noon()));
        let evaluator = QuotaEvaluator::new(store, limits, Duration::from_secs(30))
            .unwrap()
            .with_clock(clock.clone());
        (evaluator, clock)
    }

    /// Test that admission flips from allow to deny exactly at the ceiling
    #[tokio::test]
    async fn test_admits_until_limit_then_denies() {
        let store = Arc::new(MemoryStore::new());
        let (evaluator, clock) =
            evaluator_over(store.clone(), vec![LimitFactory::global_requests_per_day(3.0)]);

        for _ in 0..3 {
            let event = EventFactory::chat_at("gpt-4", clock.now());
            let result = evaluator.check_and_record(&event).await.unwrap();
            assert!(result.allowed);
        }

        let event = EventFactory::chat_at("gpt-4", clock.now());
        let result = evaluator.check_and_record(&event).await.unwrap();
        assert!(!result.allowed);
        let violation = result.first_violation().unwrap();
        assert_eq!(violation.current_usage, 3.0);
        assert_eq!(violation.projected_usage, 4.0);

        // Denied events are never written to the history.
        assert_eq!(store.event_count(), 3);
    }

    /// Test that a YAML document drives admission end to end
    #[tokio::test]
    async fn test_yaml_config_drives_admission() {
        let yaml = r#"
cache_ttl_secs: 30
limits:
  models:
    - filter: gpt-4
      limit_type: requests
      max_value: 1
      interval_unit: hour
"#;
        let config = LimitsConfig::from_yaml(yaml).unwrap();
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(test_noon()));
        let evaluator = QuotaEvaluator::from_config(store, &config)
            .unwrap()
            .with_clock(clock.clone());

        let first = EventFactory::chat_at("gpt-4", clock.now());
        assert!(evaluator.check_and_record(&first).await.unwrap().allowed);

        let second = EventFactory::chat_at("gpt-4", clock.now());
        assert!(!evaluator.check_and_record(&second).await.unwrap().allowed);

        // Another model has no applicable limit and passes untouched.
        let other = EventFactory::chat_at("claude-3", clock.now());
        assert!(evaluator.check_and_record(&other).await.unwrap().allowed);
    }

    /// Test that every breached limit is reported, in scope then unit order
    #[tokio::test]
    async fn test_all_violations_reported_in_order() {
        let limits = vec![
            LimitDefinition::scoped(
                LimitScope::User,
                "alice",
                LimitType::Requests,
                0.0,
                TimeInterval::Day,
                1,
            )
            .unwrap(),
            LimitFactory::global_requests(0.0, TimeInterval::Minute, 1),
            LimitDefinition::scoped(
                LimitScope::Model,
                "gpt-4",
                LimitType::Tokens,
                5.0,
                TimeInterval::Hour,
                1,
            )
            .unwrap(),
        ];
        let store = Arc::new(MemoryStore::new());
        let (evaluator, clock) = evaluator_over(store, limits);

        let event = EventFactory::chat_at("gpt-4", clock.now());
        let result = evaluator.check(&event).await.unwrap();

        assert!(!result.allowed);
        let scopes: Vec<LimitScope> = result
            .violations
            .iter()
            .map(|violation| violation.definition.scope)
            .collect();
        assert_eq!(
            scopes,
            vec![LimitScope::Global, LimitScope::Model, LimitScope::User]
        );
    }

    /// Test that check never records and record makes usage visible
    #[tokio::test]
    async fn test_check_is_pure_and_record_is_visible() {
        let store = Arc::new(MemoryStore::new());
        let (evaluator, clock) = evaluator_over(
            store.clone(),
            vec![LimitFactory::model_requests_per_hour("gpt-4", 1.0)],
        );

        let event = EventFactory::chat_at("gpt-4", clock.now());
        assert!(evaluator.check(&event).await.unwrap().allowed);
        assert!(evaluator.check(&event).await.unwrap().allowed);
        assert_eq!(store.event_count(), 0);

        evaluator.record(&event).await.unwrap();
        assert_eq!(store.event_count(), 1);

        // The recording is observed immediately, not after the cache TTL.
        assert!(!evaluator.check(&event).await.unwrap().allowed);
    }

    /// Test the deny-all wildcard plus unlimited allow-list pattern
    #[tokio::test]
    async fn test_unlimited_exempts_from_wildcard_denial() {
        let limits = vec![
            LimitFactory::wildcard(LimitScope::Model, LimitType::Requests, 0.0),
            LimitFactory::unlimited(LimitScope::Model, "gpt-4", LimitType::Requests),
        ];
        let store = Arc::new(MemoryStore::new());
        let (evaluator, clock) = evaluator_over(store, limits);

        let allowed = EventFactory::chat_at("gpt-4", clock.now());
        assert!(evaluator.check(&allowed).await.unwrap().allowed);

        let denied = EventFactory::chat_at("claude-3", clock.now());
        let result = evaluator.check(&denied).await.unwrap();
        assert!(!result.allowed);
        assert!(result.first_violation().unwrap().definition.is_wildcard());
    }

    /// Test that the exemption is per metric, not per scope
    #[tokio::test]
    async fn test_unlimited_exemption_is_metric_specific() {
        let limits = vec![
            LimitFactory::wildcard(LimitScope::Model, LimitType::Requests, 0.0),
            LimitFactory::wildcard(LimitScope::Model, LimitType::Tokens, 0.0),
            LimitFactory::unlimited(LimitScope::Model, "gpt-4", LimitType::Requests),
        ];
        let store = Arc::new(MemoryStore::new());
        let (evaluator, clock) = evaluator_over(store, limits);

        // Requests are exempted but the token wildcard still applies.
        let event = EventFactory::chat_at("gpt-4", clock.now());
        let result = evaluator.check(&event).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(
            result.first_violation().unwrap().definition.limit_type,
            LimitType::Tokens
        );
    }

    /// Test headroom reporting with usage already on the books
    #[tokio::test]
    async fn test_remaining_reports_headroom_and_reset() {
        let store = Arc::new(MemoryStore::new());
        for minute in 0..4 {
            let earlier = test_noon() - chrono::Duration::minutes(30 - minute);
            store
                .record_event(&EventFactory::chat_at("gpt-4", earlier))
                .await
                .unwrap();
        }
        let (evaluator, clock) =
            evaluator_over(store, vec![LimitFactory::global_requests_per_day(10.0)]);

        let event = EventFactory::chat_at("gpt-4", clock.now());
        let quotas = evaluator.remaining(&event).await.unwrap();

        assert_eq!(quotas.len(), 1);
        assert_eq!(quotas[0].current_usage, 4.0);
        assert_eq!(quotas[0].remaining, 6.0);
        // A calendar day window resets at the next midnight.
        assert_eq!(
            quotas[0].resets_at,
            Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap()
        );
    }

    /// Test that unlimited definitions report infinite headroom
    #[tokio::test]
    async fn test_remaining_is_infinite_for_unlimited() {
        let store = Arc::new(MemoryStore::new());
        let (evaluator, clock) = evaluator_over(
            store,
            vec![LimitFactory::unlimited(
                LimitScope::User,
                "alice",
                LimitType::Requests,
            )],
        );

        let event = EventFactory::chat_at("gpt-4", clock.now());
        let quotas = evaluator.remaining(&event).await.unwrap();
        assert_eq!(quotas.len(), 1);
        assert!(quotas[0].remaining.is_infinite());
    }

    /// Test the denial message shown to callers
    #[tokio::test]
    async fn test_violation_reason_names_the_limit() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..5 {
            store
                .record_event(&EventFactory::chat_at(
                    "gpt-4",
                    test_noon() - chrono::Duration::minutes(5),
                ))
                .await
                .unwrap();
        }
        let (evaluator, clock) = evaluator_over(
            store,
            vec![LimitFactory::model_tokens_per_day("gpt-4", 40.0)],
        );

        let event = EventFactory::chat_at("gpt-4", clock.now());
        let result = evaluator.check(&event).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(
            result.first_violation().unwrap().reason(),
            "MODEL (model: gpt-4) limit: 40.00 tokens per 1 day, \
             current usage: 50.00, request: 10.00"
        );
    }

    /// Test events attributed to a project against project limits
    #[tokio::test]
    async fn test_project_limits_only_see_tagged_events() {
        let store = Arc::new(MemoryStore::new());
        let (evaluator, clock) = evaluator_over(
            store,
            vec![LimitFactory::project_requests_per_day("atlas", 1.0)],
        );

        let tagged = EventFactory::project_chat("gpt-4", "atlas", clock.now());
        assert!(evaluator.check_and_record(&tagged).await.unwrap().allowed);
        assert!(!evaluator.check_and_record(&tagged).await.unwrap().allowed);

        // An untagged event is outside the project dimension entirely.
        let untagged = EventFactory::chat_at("gpt-4", clock.now());
        assert!(evaluator.check_and_record(&untagged).await.unwrap().allowed);
    }

    /// Test picking up definitions added to the store after startup
    #[tokio::test]
    async fn test_reload_limits_picks_up_store_changes() {
        let store = Arc::new(MemoryStore::with_limits(vec![
            LimitFactory::global_requests_per_day(100.0),
        ]));
        let clock = Arc::new(ManualClock::new(test_noon()));
        let evaluator = QuotaEvaluator::from_store(store.clone(), Duration::from_secs(30))
            .await
            .unwrap()
            .with_clock(clock.clone());
        assert_eq!(evaluator.limit_definitions().len(), 1);

        store
            .insert_limit(LimitFactory::model_requests_per_hour("gpt-4", 5.0))
            .await
            .unwrap();
        let loaded = evaluator.reload_limits().await.unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(evaluator.limit_definitions().len(), 2);
    }

    /// Test that a bad replacement set is rejected and the old one stays
    #[tokio::test]
    async fn test_set_limits_rejects_duplicates_and_keeps_current() {
        let store = Arc::new(MemoryStore::new());
        let (evaluator, _clock) =
            evaluator_over(store, vec![LimitFactory::global_requests_per_day(100.0)]);

        let duplicate = LimitFactory::model_requests_per_hour("gpt-4", 5.0);
        let err = evaluator
            .set_limits(vec![duplicate.clone(), duplicate])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
        assert_eq!(evaluator.limit_definitions().len(), 1);
    }

    /// Test that an unanswerable store fails the check rather than admitting
    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let store = Arc::new(FlakyStore::with_limits(vec![
            LimitFactory::global_requests_per_day(100.0),
        ]));
        let clock = Arc::new(ManualClock::new(test_noon()));
        let evaluator = QuotaEvaluator::from_store(store.clone(), Duration::from_secs(30))
            .await
            .unwrap()
            .with_clock(clock.clone());

        store.fail_sums(true);
        let event = EventFactory::chat_at("gpt-4", clock.now());
        let err = evaluator.check(&event).await.unwrap_err();
        assert!(err.is_store_unavailable());

        // Recovery needs no restart.
        store.fail_sums(false);
        assert!(evaluator.check(&event).await.unwrap().allowed);
    }

    /// Test that a failed write surfaces instead of silently dropping usage
    #[tokio::test]
    async fn test_record_failure_propagates() {
        let store = Arc::new(FlakyStore::with_limits(vec![
            LimitFactory::global_requests_per_day(100.0),
        ]));
        let clock = Arc::new(ManualClock::new(test_noon()));
        let evaluator = QuotaEvaluator::from_store(store.clone(), Duration::from_secs(30))
            .await
            .unwrap()
            .with_clock(clock.clone());

        store.fail_records(true);
        let event = EventFactory::chat_at("gpt-4", clock.now());
        let err = evaluator.check_and_record(&event).await.unwrap_err();
        assert!(err.is_store_unavailable());
        assert_eq!(store.event_count(), 0);
    }
}
