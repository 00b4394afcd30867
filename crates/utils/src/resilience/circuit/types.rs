//! Core types and enums for circuit breaker functionality.

use relaykit_core::Error;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed - requests pass through normally
    Closed,
    /// Circuit is open - requests fail immediately
    Open,
    /// Circuit is half-open - a single probe is allowed to test recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => f.write_str("closed"),
            CircuitState::Open => f.write_str("open"),
            CircuitState::HalfOpen => f.write_str("half_open"),
        }
    }
}

/// How a finished call is accounted for by the breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The dependency answered
    Success,
    /// The dependency is unhealthy
    Failure,
    /// Says nothing about the dependency (caller deadline or cancellation)
    Ignored,
}

impl Outcome {
    /// Default accounting for an error produced by a dependency call.
    ///
    /// Transient failures count against the dependency. A permanent rejection
    /// means the dependency answered, so it counts as a success. Caller-side
    /// aborts are ignored.
    pub fn for_error(error: &Error) -> Outcome {
        if error.is_caller_abort() {
            Outcome::Ignored
        } else if error.is_retryable() {
            Outcome::Failure
        } else {
            Outcome::Success
        }
    }
}

/// Which errors should trigger a retry
#[derive(Clone, Default)]
pub enum RetryOn {
    /// Retry errors the taxonomy classifies as transient
    #[default]
    Transient,
    /// Retry on all non-terminal errors
    All,
    /// Never retry
    Never,
    /// Custom retry predicate
    Custom(Arc<dyn Fn(&Error) -> bool + Send + Sync>),
}

impl fmt::Debug for RetryOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryOn::Transient => write!(f, "RetryOn::Transient"),
            RetryOn::All => write!(f, "RetryOn::All"),
            RetryOn::Never => write!(f, "RetryOn::Never"),
            RetryOn::Custom(_) => write!(f, "RetryOn::Custom(<predicate>)"),
        }
    }
}

/// Point-in-time statistics of one circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    /// Consecutive failures counted towards opening
    pub failure_count: u32,
    /// Calls the breaker let through
    pub permitted_calls: u64,
    /// Calls rejected with `CircuitOpen`
    pub rejected_calls: u64,
    pub successes: u64,
    pub failures: u64,
    /// Number of state transitions since creation
    pub transitions: u64,
    /// Time since the most recent counted failure
    pub since_last_failure: Option<Duration>,
    /// Time since the most recent state change
    pub since_last_change: Duration,
    #[serde(skip)]
    pub last_failure_time: Option<Instant>,
    #[serde(skip)]
    pub last_state_change: Instant,
}
