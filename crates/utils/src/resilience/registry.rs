//! Named circuit breakers shared across clients
//!
//! The registry is an ordinary value owned by the embedding service and passed
//! by reference to whatever builds clients. Two clients resolving the same
//! dependency name get the same `Arc<CircuitBreaker>`, so their failures are
//! counted together.

use super::circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats};
use dashmap::DashMap;
use relaykit_config::RelayConfig;
use std::sync::Arc;
use tracing::debug;

/// Map of dependency name to its shared breaker
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    default_config: CircuitBreakerConfig,
    overrides: DashMap<String, CircuitBreakerConfig>,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Create an empty registry whose breakers use `default_config`
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            default_config,
            overrides: DashMap::new(),
            breakers: DashMap::new(),
        }
    }

    /// Registry configured from the `breaker` section and per-dependency overrides
    pub fn from_config(config: &RelayConfig) -> Self {
        config.dependencies.iter().fold(
            Self::new(CircuitBreakerConfig::from(&config.breaker)),
            |registry, (name, overrides)| match &overrides.breaker {
                Some(breaker) => registry.with_override(name, CircuitBreakerConfig::from(breaker)),
                None => registry,
            },
        )
    }

    /// Use `config` instead of the default for breakers created for `name`
    pub fn with_override(self, name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        self.overrides.insert(name.into(), config);
        self
    }

    /// The breaker for `name`, created on first use
    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return Arc::clone(existing.value());
        }

        let entry = self.breakers.entry(name.to_string()).or_insert_with(|| {
            let config = self
                .overrides
                .get(name)
                .map(|c| c.value().clone())
                .unwrap_or_else(|| self.default_config.clone());
            debug!(
                dependency = name,
                max_failures = config.max_failures,
                open_timeout_ms = config.open_timeout.as_millis() as u64,
                "created circuit breaker"
            );
            Arc::new(CircuitBreaker::new(name, config))
        });
        Arc::clone(entry.value())
    }

    /// The breaker for `name` if one was already created
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|b| Arc::clone(b.value()))
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Statistics of every breaker, sorted by name
    pub fn snapshot(&self) -> Vec<(String, CircuitBreakerStats)> {
        let mut stats: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().stats()))
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaykit_config::{BreakerSettings, DependencySettings};
    use std::time::Duration;

    #[test]
    fn test_same_name_shares_breaker() {
        let registry = BreakerRegistry::new(CircuitBreakerConfig::default());
        let a = registry.get_or_create("payments");
        let b = registry.get_or_create("payments");
        let c = registry.get_or_create("inventory");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
        assert!(registry.get("shipping").is_none());
    }

    #[test]
    fn test_override_applies_to_named_dependency() {
        let registry = BreakerRegistry::new(CircuitBreakerConfig::default()).with_override(
            "payments",
            CircuitBreakerConfig {
                max_failures: 2,
                open_timeout: Duration::from_secs(1),
            },
        );

        assert_eq!(registry.get_or_create("payments").config().max_failures, 2);
        assert_eq!(registry.get_or_create("inventory").config().max_failures, 5);
    }

    #[test]
    fn test_from_config() {
        let mut config = RelayConfig::default();
        config.breaker.max_failures = 7;
        config.dependencies.insert(
            "payments".to_string(),
            DependencySettings {
                breaker: Some(BreakerSettings {
                    max_failures: 3,
                    open_timeout_ms: 10_000,
                }),
                ..Default::default()
            },
        );

        let registry = BreakerRegistry::from_config(&config);
        let payments = registry.get_or_create("payments");
        assert_eq!(payments.config().max_failures, 3);
        assert_eq!(payments.config().open_timeout, Duration::from_secs(10));
        assert_eq!(registry.get_or_create("inventory").config().max_failures, 7);
    }

    #[tokio::test]
    async fn test_snapshot_sorted_by_name() {
        let registry = BreakerRegistry::default();
        registry.get_or_create("shipping");
        registry.get_or_create("inventory");
        registry.get_or_create("payments");

        let names: Vec<_> = registry.snapshot().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["inventory", "payments", "shipping"]);
    }
}
