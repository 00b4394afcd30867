//! State transition logic for circuit breaker.
//!
//! Everything here runs with the breaker's mutex held and never awaits.

use super::config::CircuitBreakerConfig;
use super::metrics::MetricsState;
use super::types::{CircuitState, Outcome};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Admission granted to one call
#[derive(Debug, Clone, Copy)]
pub struct Permit {
    /// Generation the call was admitted under
    pub generation: u64,
    /// Whether this call is the single HalfOpen probe
    pub probe: bool,
}

/// Handles state transitions for circuit breaker
#[derive(Debug)]
pub struct StateTransitions {
    name: String,
    config: CircuitBreakerConfig,
}

impl StateTransitions {
    /// Create new state transitions handler
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        Self { name, config }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Decide whether a call may proceed. On rejection returns the time left
    /// until a probe would be admitted.
    pub fn admit(&self, metrics: &mut MetricsState, now: Instant) -> Result<Permit, Duration> {
        match metrics.state {
            CircuitState::Closed => {
                metrics.counters.permitted += 1;
                Ok(Permit {
                    generation: metrics.generation,
                    probe: false,
                })
            }
            CircuitState::Open => {
                let opened_at = metrics
                    .last_failure_time
                    .unwrap_or(metrics.last_state_change);
                let elapsed = now.saturating_duration_since(opened_at);
                // Closed-open window: a call exactly `open_timeout` after the
                // last failure is admitted as the probe
                if elapsed < self.config.open_timeout {
                    metrics.counters.rejected += 1;
                    return Err(self.config.open_timeout - elapsed);
                }
                self.transition(metrics, CircuitState::HalfOpen, now);
                Ok(self.take_probe(metrics))
            }
            CircuitState::HalfOpen => {
                if metrics.probe_in_flight {
                    metrics.counters.rejected += 1;
                    return Err(self.config.open_timeout);
                }
                Ok(self.take_probe(metrics))
            }
        }
    }

    fn take_probe(&self, metrics: &mut MetricsState) -> Permit {
        metrics.probe_in_flight = true;
        metrics.counters.permitted += 1;
        Permit {
            generation: metrics.generation,
            probe: true,
        }
    }

    /// Apply the outcome of a permitted call
    pub fn record(
        &self,
        metrics: &mut MetricsState,
        permit: Permit,
        outcome: Outcome,
        now: Instant,
    ) {
        match outcome {
            Outcome::Success => metrics.counters.successes += 1,
            Outcome::Failure => metrics.counters.failures += 1,
            Outcome::Ignored => {}
        }

        // Only act on the state the call was admitted under
        if permit.generation != metrics.generation {
            return;
        }
        if permit.probe {
            metrics.probe_in_flight = false;
        }

        match (outcome, metrics.state) {
            (Outcome::Ignored, _) => {}
            (Outcome::Success, CircuitState::Closed) => {
                metrics.failure_count = 0;
            }
            (Outcome::Success, CircuitState::HalfOpen) => {
                metrics.failure_count = 0;
                self.transition(metrics, CircuitState::Closed, now);
            }
            (Outcome::Failure, CircuitState::Closed) => {
                metrics.failure_count += 1;
                metrics.last_failure_time = Some(now);
                if metrics.failure_count >= self.config.max_failures {
                    self.transition(metrics, CircuitState::Open, now);
                }
            }
            (Outcome::Failure, CircuitState::HalfOpen) => {
                // A failed probe always reopens with a fresh window
                metrics.failure_count = self.config.max_failures.max(metrics.failure_count + 1);
                metrics.last_failure_time = Some(now);
                self.transition(metrics, CircuitState::Open, now);
            }
            (_, CircuitState::Open) => {}
        }
    }

    /// Free the probe slot of a call that never reported an outcome
    pub fn release(&self, metrics: &mut MetricsState, permit: Permit) {
        if permit.probe && permit.generation == metrics.generation {
            metrics.probe_in_flight = false;
        }
    }

    fn transition(&self, metrics: &mut MetricsState, to: CircuitState, now: Instant) {
        let from = metrics.state;
        if from == to {
            return;
        }

        match to {
            CircuitState::Open => warn!(
                dependency = %self.name,
                %from,
                failures = metrics.failure_count,
                open_timeout_ms = self.config.open_timeout.as_millis() as u64,
                "circuit breaker opened"
            ),
            CircuitState::HalfOpen => info!(
                dependency = %self.name,
                %from,
                "circuit breaker half-open, admitting probe"
            ),
            CircuitState::Closed => info!(
                dependency = %self.name,
                %from,
                "circuit breaker closed"
            ),
        }

        metrics.state = to;
        metrics.last_state_change = now;
        metrics.generation += 1;
        metrics.counters.transitions += 1;
        metrics.probe_in_flight = false;
        if to == CircuitState::HalfOpen {
            metrics.failure_count = 0;
        }
    }
}
