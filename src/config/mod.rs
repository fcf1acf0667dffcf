//! Limits configuration
//!
//! Limit declarations live in a YAML document, grouped by scope. The
//! groups are flattened into validated [`LimitDefinition`]s at load time,
//! so the evaluator never sees an unknown scope, metric, or interval
//! string.

pub mod models;

pub use models::{GlobalLimitEntry, LimitGroups, ScopedLimitEntry};

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::models::{LimitDefinition, LimitScope, validate_definitions};
use crate::utils::{AccountingError, Result};

fn default_cache_ttl_secs() -> u64 {
    30
}

/// Root of the limits configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Seconds a cached aggregate may be served; 0 disables caching
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Limit declarations grouped by scope
    #[serde(default)]
    pub limits: LimitGroups,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            limits: LimitGroups::default(),
        }
    }
}

impl LimitsConfig {
    /// Load configuration from file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading limits configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AccountingError::Config(format!("Failed to read limits file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| AccountingError::Config(format!("Failed to parse limits config: {}", e)))?;

        config.validate()?;

        debug!(
            "Limits configuration loaded with {} declarations",
            config.limits.len()
        );
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        self.definitions().map(|_| ())
    }

    /// Materializes the declarations as validated limit definitions.
    pub fn definitions(&self) -> Result<Vec<LimitDefinition>> {
        let groups = &self.limits;
        let mut definitions = Vec::with_capacity(groups.len());

        for entry in &groups.global {
            let definition = LimitDefinition::global(
                entry.limit_type,
                entry.max_value,
                entry.interval_unit,
                entry.interval_value,
            )
            .map_err(|e| {
                AccountingError::Config(format!("Global limit entry invalid: {}", e))
            })?;
            definitions.push(definition);
        }

        for (scope, entries) in [
            (LimitScope::Model, &groups.models),
            (LimitScope::User, &groups.users),
            (LimitScope::Caller, &groups.callers),
            (LimitScope::Project, &groups.projects),
        ] {
            for entry in entries {
                let definition = LimitDefinition::scoped(
                    scope,
                    &entry.filter,
                    entry.limit_type,
                    entry.max_value,
                    entry.interval_unit,
                    entry.interval_value,
                )
                .map_err(|e| {
                    AccountingError::Config(format!(
                        "{} limit entry '{}' invalid: {}",
                        scope, entry.filter, e
                    ))
                })?;
                definitions.push(definition);
            }
        }

        validate_definitions(&definitions)
            .map_err(|e| AccountingError::Config(e.to_string()))?;
        Ok(definitions)
    }

    /// TTL for cached usage aggregates.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
