//! Resilience patterns for calls to other services.
//!
//! ## Key Components
//!
//! - **`circuit`**: The circuit breaker state machine plus the retry policy and
//!   retry loops built on it.
//! - **`registry`**: Named breakers shared between clients of one dependency.
//! - **`client`**: `ResilientClient`, which wraps one outbound call with a
//!   per-attempt timeout, bounded retries and a breaker.

pub mod circuit;
pub mod client;
pub mod registry;

pub use circuit::{
    retry, retry_with_circuit_breaker, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats,
    CircuitState, Outcome, RetryOn, RetryPolicy,
};
pub use client::{
    ClientBuilder, FnTransport, Method, Request, ResilientClient, Response, Transport,
    TransportError, TransportErrorKind,
};
pub use registry::BreakerRegistry;
