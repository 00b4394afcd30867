//! Metrics and statistics tracking for circuit breaker.

use super::types::{CircuitBreakerStats, CircuitState};
use tokio::time::Instant;

/// Lifetime counters of one breaker
#[derive(Debug, Default, Clone, Copy)]
pub struct BreakerCounters {
    pub permitted: u64,
    pub rejected: u64,
    pub successes: u64,
    pub failures: u64,
    pub transitions: u64,
}

/// Mutable breaker state guarded by the breaker's mutex
#[derive(Debug)]
pub struct MetricsState {
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_time: Option<Instant>,
    pub last_state_change: Instant,
    /// Bumped on every transition so results from an older state are not applied
    pub generation: u64,
    pub probe_in_flight: bool,
    pub counters: BreakerCounters,
}

impl MetricsState {
    /// Create new metrics state
    pub fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_time: None,
            last_state_change: Instant::now(),
            generation: 0,
            probe_in_flight: false,
            counters: BreakerCounters::default(),
        }
    }

    /// Snapshot the current statistics
    pub fn stats(&self, now: Instant) -> CircuitBreakerStats {
        CircuitBreakerStats {
            state: self.state,
            failure_count: self.failure_count,
            permitted_calls: self.counters.permitted,
            rejected_calls: self.counters.rejected,
            successes: self.counters.successes,
            failures: self.counters.failures,
            transitions: self.counters.transitions,
            since_last_failure: self
                .last_failure_time
                .map(|at| now.saturating_duration_since(at)),
            since_last_change: now.saturating_duration_since(self.last_state_change),
            last_failure_time: self.last_failure_time,
            last_state_change: self.last_state_change,
        }
    }
}

impl Default for MetricsState {
    fn default() -> Self {
        Self::new()
    }
}
