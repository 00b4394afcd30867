//! Circuit breaker and retry building blocks
//!
//! ## Architecture
//!
//! - [`types`] - Core types and enums (CircuitState, Outcome, RetryOn, stats)
//! - [`config`] - Configuration for retry and circuit breaker behavior
//! - [`metrics`] - Mutable state and lifetime counters
//! - [`transitions`] - State transition logic
//! - [`state`] - The `CircuitBreaker` itself
//! - [`retry`] - Retry loops, with and without a breaker
//!
//! ## Examples
//!
//! ### Circuit Breaker
//!
//! ```rust,no_run
//! use relaykit_utils::resilience::circuit::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> relaykit_core::Result<String> {
//! let cb = CircuitBreaker::new("inventory", CircuitBreakerConfig::default());
//!
//! let result = cb.call(|| async {
//!     // Your operation here
//!     Ok("success".to_string())
//! }).await;
//! result
//! # }
//! ```
//!
//! ### Combined Retry with Circuit Breaker
//!
//! ```rust,no_run
//! use relaykit_core::CallContext;
//! use relaykit_utils::resilience::circuit::{
//!     retry_with_circuit_breaker, CircuitBreaker, CircuitBreakerConfig, RetryPolicy,
//! };
//! use std::time::Duration;
//!
//! # async fn example() -> relaykit_core::Result<String> {
//! let cb = CircuitBreaker::new("inventory", CircuitBreakerConfig::default());
//! let ctx = CallContext::with_timeout(Duration::from_secs(2));
//!
//! retry_with_circuit_breaker(&RetryPolicy::default(), &cb, &ctx, |_attempt| async {
//!     Ok("success".to_string())
//! })
//! .await
//! # }
//! ```

pub mod config;
pub mod metrics;
pub mod retry;
pub mod state;
pub mod transitions;
pub mod types;

// Re-export public API
pub use config::{CircuitBreakerConfig, RetryPolicy};
pub use retry::{retry, retry_with_circuit_breaker};
pub use state::CircuitBreaker;
pub use types::{CircuitBreakerStats, CircuitState, Outcome, RetryOn};
