//! Shared runtime utilities for relaykit
//!
//! - **`resilience`**: circuit breakers, retry policies, the breaker registry
//!   and the resilient outbound client.
//! - **`tracing`**: subscriber initialisation and span helpers.

pub mod resilience;
pub mod tracing;

pub use resilience::*;
