//! Circuit breaker state management and execution logic.

use super::config::CircuitBreakerConfig;
use super::metrics::MetricsState;
use super::transitions::{Permit, StateTransitions};
use super::types::{CircuitBreakerStats, CircuitState, Outcome};
use parking_lot::Mutex;
use relaykit_core::{Error, Result};
use std::future::Future;
use tokio::time::Instant;

/// Circuit breaker guarding one dependency.
///
/// Share it behind an `Arc`; every read-modify-write of its state happens under
/// a single mutex that is never held across an await point.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    metrics: Mutex<MetricsState>,
    transitions: StateTransitions,
}

impl CircuitBreaker {
    /// Create a new circuit breaker for `name` with the given configuration
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        Self {
            transitions: StateTransitions::new(name.clone(), config),
            name,
            metrics: Mutex::new(MetricsState::new()),
        }
    }

    /// Name of the guarded dependency
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        self.transitions.config()
    }

    /// The stored state. An Open breaker whose timeout has elapsed still reports
    /// Open until the next call is admitted as the probe.
    pub fn state(&self) -> CircuitState {
        self.metrics.lock().state
    }

    /// Get current circuit breaker statistics
    pub fn stats(&self) -> CircuitBreakerStats {
        self.metrics.lock().stats(Instant::now())
    }

    /// Execute an operation through the circuit breaker, counting every error
    /// as a failure
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.call_with(operation, |_| Outcome::Failure).await
    }

    /// Execute an operation through the circuit breaker, letting `classify`
    /// decide how an error is accounted for
    pub async fn call_with<F, Fut, T, C>(&self, operation: F, classify: C) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: FnOnce(&Error) -> Outcome,
    {
        let permit = self.admit()?;
        let mut guard = PermitGuard {
            breaker: self,
            permit: Some(permit),
        };

        let result = operation().await;
        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(error) => classify(error),
        };
        guard.finish(outcome);

        result
    }

    fn admit(&self) -> Result<Permit> {
        let mut metrics = self.metrics.lock();
        self.transitions
            .admit(&mut metrics, Instant::now())
            .map_err(|retry_after| Error::circuit_open(&self.name, retry_after))
    }
}

/// Releases a HalfOpen probe slot when the call future is dropped before
/// reporting an outcome
struct PermitGuard<'a> {
    breaker: &'a CircuitBreaker,
    permit: Option<Permit>,
}

impl PermitGuard<'_> {
    fn finish(&mut self, outcome: Outcome) {
        if let Some(permit) = self.permit.take() {
            let mut metrics = self.breaker.metrics.lock();
            self.breaker
                .transitions
                .record(&mut metrics, permit, outcome, Instant::now());
        }
    }
}

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            let mut metrics = self.breaker.metrics.lock();
            self.breaker.transitions.release(&mut metrics, permit);
        }
    }
}
