//! Centralized configuration for relaykit
//!
//! [`RelayConfig`] is the single source of truth for the static policy knobs of
//! a service: breaker thresholds, retry budgets, per-call timeouts, bus
//! shutdown grace and saga compensation bounds. It is immutable after loading
//! and cheap to clone into the components that need a section of it.
//!
//! Durations are stored as milliseconds so the file format stays plain JSON.

use relaykit_core::{Error, Result, DEFAULT_SERVICE_NAME};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Immutable configuration for one service embedding relaykit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Producing-service identifier stamped on published events
    pub service_name: String,

    /// Default circuit breaker policy
    pub breaker: BreakerSettings,

    /// Default retry policy
    pub retry: RetrySettings,

    /// Default outbound client settings
    pub client: ClientSettings,

    /// Event bus settings
    pub bus: BusSettings,

    /// Saga orchestrator settings
    pub saga: SagaSettings,

    /// Per-dependency overrides keyed by dependency name
    pub dependencies: BTreeMap<String, DependencySettings>,
}

/// Circuit breaker thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreakerSettings {
    /// Consecutive failures that open the circuit
    pub max_failures: u32,

    /// How long the circuit stays open before admitting a probe
    pub open_timeout_ms: u64,
}

/// Retry budget and backoff shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,

    /// Fraction of the exponential delay added as random jitter, 0.0 to 1.0
    pub jitter_factor: f64,
}

/// Outbound client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSettings {
    /// Upper bound for a single attempt
    pub call_timeout_ms: u64,
}

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusSettings {
    /// Capacity of the in-memory broker queue
    pub queue_capacity: usize,

    /// Time in-flight handlers get to finish after `stop`
    pub shutdown_grace_ms: u64,

    /// Number of recent handler failures kept for inspection
    pub failure_history: usize,
}

/// Saga orchestrator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SagaSettings {
    /// Upper bound for each compensating action, unbounded when absent
    pub compensation_timeout_ms: Option<u64>,
}

/// Overrides applied on top of the defaults for a single dependency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DependencySettings {
    pub breaker: Option<BreakerSettings>,
    pub retry: Option<RetrySettings>,
    pub call_timeout_ms: Option<u64>,
}

/// Fully resolved policy for one dependency
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDependency {
    pub breaker: BreakerSettings,
    pub retry: RetrySettings,
    pub client: ClientSettings,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            breaker: BreakerSettings::default(),
            retry: RetrySettings::default(),
            client: ClientSettings::default(),
            bus: BusSettings::default(),
            saga: SagaSettings::default(),
            dependencies: BTreeMap::new(),
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            max_failures: 5,
            open_timeout_ms: 30_000,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 10_000,
            jitter_factor: 0.1,
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            call_timeout_ms: 5_000,
        }
    }
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            shutdown_grace_ms: 5_000,
            failure_history: 100,
        }
    }
}

impl Default for SagaSettings {
    fn default() -> Self {
        Self {
            compensation_timeout_ms: Some(30_000),
        }
    }
}

impl BreakerSettings {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    fn validate(&self, scope: &str) -> Result<()> {
        if self.max_failures == 0 {
            return Err(Error::configuration(format!(
                "{scope}.max_failures must be at least 1"
            )));
        }
        Ok(())
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    fn validate(&self, scope: &str) -> Result<()> {
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(Error::configuration(format!(
                "{scope}.jitter_factor must be within 0.0..=1.0, got {}",
                self.jitter_factor
            )));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(Error::configuration(format!(
                "{scope}.max_delay_ms ({}) is smaller than base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        Ok(())
    }
}

impl ClientSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl BusSettings {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl SagaSettings {
    pub fn compensation_timeout(&self) -> Option<Duration> {
        self.compensation_timeout_ms.map(Duration::from_millis)
    }
}

impl RelayConfig {
    /// Policy for `dependency`, with its overrides layered over the defaults
    pub fn dependency(&self, dependency: &str) -> ResolvedDependency {
        let overrides = self.dependencies.get(dependency);
        ResolvedDependency {
            breaker: overrides
                .and_then(|o| o.breaker.clone())
                .unwrap_or_else(|| self.breaker.clone()),
            retry: overrides
                .and_then(|o| o.retry.clone())
                .unwrap_or_else(|| self.retry.clone()),
            client: ClientSettings {
                call_timeout_ms: overrides
                    .and_then(|o| o.call_timeout_ms)
                    .unwrap_or(self.client.call_timeout_ms),
            },
        }
    }

    /// Reject configurations that would make the runtime misbehave
    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(Error::configuration("service_name must not be empty"));
        }
        self.breaker.validate("breaker")?;
        self.retry.validate("retry")?;
        if self.client.call_timeout_ms == 0 {
            return Err(Error::configuration(
                "client.call_timeout_ms must be greater than zero",
            ));
        }
        if self.bus.queue_capacity == 0 {
            return Err(Error::configuration(
                "bus.queue_capacity must be greater than zero",
            ));
        }

        for (name, overrides) in &self.dependencies {
            if let Some(breaker) = &overrides.breaker {
                breaker.validate(&format!("dependencies.{name}.breaker"))?;
            }
            if let Some(retry) = &overrides.retry {
                retry.validate(&format!("dependencies.{name}.retry"))?;
            }
            if overrides.call_timeout_ms == Some(0) {
                return Err(Error::configuration(format!(
                    "dependencies.{name}.call_timeout_ms must be greater than zero"
                )));
            }
        }

        Ok(())
    }
}
