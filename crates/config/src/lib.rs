//! Configuration model and loading for relaykit
//!
//! This crate owns the static policy objects (breaker thresholds, retry
//! budgets, timeouts, shutdown grace) that the runtime crates convert into
//! their own types at construction time.

pub mod config;
pub mod loader;

#[cfg(test)]
mod config_tests;

pub use config::{
    BreakerSettings, BusSettings, ClientSettings, DependencySettings, RelayConfig,
    ResolvedDependency, RetrySettings, SagaSettings,
};
pub use loader::ConfigLoader;
