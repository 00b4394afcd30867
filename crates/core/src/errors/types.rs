//! Core error type definitions

use std::time::Duration;

/// Result type alias for relaykit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed source error carried by transport-classified variants
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure taxonomy shared by the client, the event bus and the saga orchestrator
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The dependency's circuit is open; the call was rejected without being attempted
    CircuitOpen {
        dependency: String,
        retry_after: Duration,
    },

    /// Transient dependency failure (connection reset, 5xx-class, throttling)
    Retryable {
        dependency: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A single attempt exceeded its per-call timeout
    AttemptTimeout {
        dependency: String,
        timeout: Duration,
    },

    /// Malformed-request-class failure that will not succeed on retry
    NonRetryable {
        dependency: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The caller-imposed deadline fired
    DeadlineExceeded {
        operation: String,
        budget: Option<Duration>,
    },

    /// The caller cancelled the operation
    Cancelled { operation: String },

    /// Every permitted attempt failed with a retryable error
    RetriesExhausted {
        dependency: String,
        attempts: u32,
        #[source]
        last: Box<Error>,
    },

    /// An event subscriber failed to process an event
    Handler {
        topic: String,
        subscriber: String,
        message: String,
    },

    /// The event transport refused or could not accept an event
    Publish { topic: String, message: String },

    /// A saga step failed; `source` is the original forward error
    SagaStep {
        saga: String,
        step: String,
        index: usize,
        #[source]
        source: Box<Error>,
        compensation_failures: Vec<String>,
    },

    /// Configuration errors
    Configuration { message: String },

    /// JSON serialization/deserialization errors
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}
