//! Configuration wiring tests
//!
//! Load limit declarations from YAML files and verify they drive the
//! evaluator, including the cache TTL knob.

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use llm_accounting_rs::{Clock, LimitsConfig, ManualClock, QuotaEvaluator};
    use tempfile::NamedTempFile;

    use crate::common::{test_noon, CountingStore, EventFactory};

    /// Test the full path from a file on disk to a denial
    #[tokio::test]
    async fn test_file_config_reaches_the_decision() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
limits:
  global:
    - limit_type: requests
      max_value: 0
      interval_unit: day
"#
        )
        .unwrap();

        let config = LimitsConfig::from_file(file.path()).await.unwrap();
        let store = Arc::new(CountingStore::new());
        let clock = Arc::new(ManualClock::new(test_noon()));
        let evaluator = QuotaEvaluator::from_config(store, &config)
            .unwrap()
            .with_clock(clock.clone());

        let event = EventFactory::chat_at("gpt-4", clock.now());
        assert!(!evaluator.check(&event).await.unwrap().allowed);
    }

    /// Test that a configured zero TTL restores read-your-writes checks
    #[tokio::test]
    async fn test_configured_zero_ttl_bypasses_cache() {
        let yaml = r#"
cache_ttl_secs: 0
limits:
  models:
    - filter: gpt-4
      limit_type: requests
      max_value: 1
      interval_unit: hour
"#;
        let config = LimitsConfig::from_yaml(yaml).unwrap();
        let store = Arc::new(CountingStore::new());
        let clock = Arc::new(ManualClock::new(test_noon()));
        let evaluator = QuotaEvaluator::from_config(store.clone(), &config)
            .unwrap()
            .with_clock(clock.clone());

        let event = EventFactory::chat_at("gpt-4", clock.now());
        assert!(evaluator.check(&event).await.unwrap().allowed);
        evaluator.record(&event).await.unwrap();
        assert!(!evaluator.check(&event).await.unwrap().allowed);

        // Every check aggregated, nothing was served from cache.
        assert_eq!(store.sum_queries(), 2);
    }

    /// Test the allow-list pattern declared purely in YAML
    #[tokio::test]
    async fn test_yaml_wildcard_with_unlimited_exemption() {
        let yaml = r#"
limits:
  models:
    - filter: "*"
      limit_type: requests
      max_value: 0
      interval_unit: day
    - filter: gpt-4
      limit_type: requests
      max_value: -1
      interval_unit: day
"#;
        let config = LimitsConfig::from_yaml(yaml).unwrap();
        let store = Arc::new(CountingStore::new());
        let clock = Arc::new(ManualClock::new(test_noon()));
        let evaluator = QuotaEvaluator::from_config(store, &config)
            .unwrap()
            .with_clock(clock.clone());

        let exempted = EventFactory::chat_at("gpt-4", clock.now());
        assert!(evaluator.check(&exempted).await.unwrap().allowed);

        let denied = EventFactory::chat_at("claude-3", clock.now());
        assert!(!evaluator.check(&denied).await.unwrap().allowed);
    }

    /// Test that a config rejected at parse time never reaches the engine
    #[tokio::test]
    async fn test_invalid_config_is_rejected_up_front() {
        let yaml = r#"
limits:
  users:
    - filter: alice
      limit_type: requests
      max_value: 10
      interval_unit: day
    - filter: alice
      limit_type: requests
      max_value: 20
      interval_unit: day
"#;
        let err = LimitsConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
