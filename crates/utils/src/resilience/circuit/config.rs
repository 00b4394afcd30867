//! Configuration structs and implementations for retry and circuit breaker behavior.

use super::types::RetryOn;
use relaykit_config::{BreakerSettings, RetrySettings};
use relaykit_core::Error;
use std::time::Duration;

/// Default maximum number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff (100ms)
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Default maximum delay for exponential backoff (10s)
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Default jitter factor (0.1 = up to 10% added)
const DEFAULT_JITTER_FACTOR: f64 = 0.1;

/// Retry budget and backoff shape
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries; total attempts never exceed `max_retries + 1`
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Fraction of the exponential delay added as jitter (0.0 to 1.0)
    pub jitter_factor: f64,
    /// Which errors are worth another attempt
    pub retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter_factor: DEFAULT_JITTER_FACTOR,
            retry_on: RetryOn::Transient,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            retry_on: RetryOn::Never,
            ..Default::default()
        }
    }

    /// Check if an error should be retried.
    ///
    /// Circuit-open, deadline and cancellation errors are never retried,
    /// whatever the predicate says.
    pub fn should_retry(&self, error: &Error) -> bool {
        if error.is_terminal() {
            return false;
        }
        match &self.retry_on {
            RetryOn::Transient => error.is_retryable(),
            RetryOn::All => true,
            RetryOn::Never => false,
            RetryOn::Custom(predicate) => predicate(error),
        }
    }

    /// Delay before the retry that follows attempt `attempt` (zero-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay_with_jitter(attempt, rand::random::<f64>())
    }

    /// Deterministic backoff for a given jitter sample `unit` in `[0, 1)`.
    ///
    /// `min(base * 2^attempt * (1 + jitter_factor * unit), max_delay)`. Since
    /// the jitter never more than doubles a delay, the sequence is
    /// non-decreasing in `attempt` for any choice of samples.
    pub fn delay_with_jitter(&self, attempt: u32, unit: f64) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        if exponential >= self.max_delay {
            return self.max_delay;
        }

        let factor = self.jitter_factor.clamp(0.0, 1.0) * unit.clamp(0.0, 1.0);
        if factor == 0.0 {
            return exponential;
        }
        exponential.mul_f64(1.0 + factor).min(self.max_delay)
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: settings.base_delay(),
            max_delay: settings.max_delay(),
            jitter_factor: settings.jitter_factor,
            retry_on: RetryOn::Transient,
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub max_failures: u32,
    /// Duration to wait after the last failure before admitting a probe
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            open_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&BreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &BreakerSettings) -> Self {
        Self {
            max_failures: settings.max_failures.max(1),
            open_timeout: settings.open_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_delay_without_jitter_doubles() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            jitter_factor: 0.0,
            ..Default::default()
        };

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_secs(1));
        assert_eq!(policy.delay_for(60), Duration::from_secs(1));
    }

    #[test]
    fn test_delay_with_jitter_stays_in_range() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter_factor: 0.5,
            ..Default::default()
        };

        for _ in 0..50 {
            let delay = policy.delay_for(2);
            assert!(delay >= Duration::from_millis(400));
            assert!(delay <= Duration::from_millis(600));
        }
    }

    #[test]
    fn test_should_retry_predicates() {
        let transient = Error::retryable("payments", "connection reset");
        let permanent = Error::non_retryable("payments", "bad request");
        let open = Error::circuit_open("payments", Duration::from_secs(1));

        let policy = RetryPolicy::default();
        assert!(policy.should_retry(&transient));
        assert!(!policy.should_retry(&permanent));
        assert!(!policy.should_retry(&open));

        let all = RetryPolicy {
            retry_on: RetryOn::All,
            ..Default::default()
        };
        assert!(all.should_retry(&permanent));
        assert!(!all.should_retry(&Error::cancelled("invoke")));

        let custom = RetryPolicy {
            retry_on: RetryOn::Custom(Arc::new(|e| e.to_string().contains("bad"))),
            ..Default::default()
        };
        assert!(custom.should_retry(&permanent));
        assert!(!custom.should_retry(&transient));

        assert!(!RetryPolicy::no_retry().should_retry(&transient));
    }

    #[test]
    fn test_from_settings() {
        let policy = RetryPolicy::from(&RetrySettings::default());
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(100));

        let breaker = CircuitBreakerConfig::from(&BreakerSettings {
            max_failures: 3,
            open_timeout_ms: 10_000,
        });
        assert_eq!(breaker.max_failures, 3);
        assert_eq!(breaker.open_timeout, Duration::from_secs(10));
    }

    proptest! {
        #[test]
        fn backoff_is_monotonic(
            base_ms in 0u64..2_000,
            cap_ms in 0u64..120_000,
            jitter in 0.0f64..=1.0,
            samples in proptest::collection::vec(0.0f64..1.0, 12),
        ) {
            let policy = RetryPolicy {
                base_delay: Duration::from_millis(base_ms),
                max_delay: Duration::from_millis(cap_ms.max(base_ms)),
                jitter_factor: jitter,
                ..Default::default()
            };

            let delays: Vec<Duration> = samples
                .iter()
                .enumerate()
                .map(|(attempt, unit)| policy.delay_with_jitter(attempt as u32, *unit))
                .collect();

            for pair in delays.windows(2) {
                prop_assert!(pair[0] <= pair[1], "{:?} > {:?}", pair[0], pair[1]);
            }
            for delay in &delays {
                prop_assert!(*delay <= policy.max_delay);
            }
        }
    }
}
