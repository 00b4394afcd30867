//! Builder methods for creating errors with context

use super::types::{BoxError, Error};
use std::time::Duration;

impl Error {
    /// Create a circuit-open rejection
    #[must_use]
    pub fn circuit_open(dependency: impl Into<String>, retry_after: Duration) -> Self {
        Error::CircuitOpen {
            dependency: dependency.into(),
            retry_after,
        }
    }

    /// Create a transient dependency failure
    #[must_use]
    pub fn retryable(dependency: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Retryable {
            dependency: dependency.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a transient dependency failure with a source error
    #[must_use]
    pub fn retryable_with_source(
        dependency: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Error::Retryable {
            dependency: dependency.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a per-attempt timeout
    #[must_use]
    pub fn attempt_timeout(dependency: impl Into<String>, timeout: Duration) -> Self {
        Error::AttemptTimeout {
            dependency: dependency.into(),
            timeout,
        }
    }

    /// Create a permanent (non-retryable) dependency failure
    #[must_use]
    pub fn non_retryable(dependency: impl Into<String>, message: impl Into<String>) -> Self {
        Error::NonRetryable {
            dependency: dependency.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a permanent dependency failure with a source error
    #[must_use]
    pub fn non_retryable_with_source(
        dependency: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Error::NonRetryable {
            dependency: dependency.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a deadline-exceeded error
    #[must_use]
    pub fn deadline_exceeded(operation: impl Into<String>, budget: Option<Duration>) -> Self {
        Error::DeadlineExceeded {
            operation: operation.into(),
            budget,
        }
    }

    /// Create a cancellation error
    #[must_use]
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Error::Cancelled {
            operation: operation.into(),
        }
    }

    /// Wrap the last observed error after the retry budget ran out
    #[must_use]
    pub fn retries_exhausted(dependency: impl Into<String>, attempts: u32, last: Error) -> Self {
        Error::RetriesExhausted {
            dependency: dependency.into(),
            attempts,
            last: Box::new(last),
        }
    }

    /// Create a subscriber failure
    #[must_use]
    pub fn handler(
        topic: impl Into<String>,
        subscriber: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Handler {
            topic: topic.into(),
            subscriber: subscriber.into(),
            message: message.into(),
        }
    }

    /// Create a publish failure
    #[must_use]
    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Wrap a forward saga failure together with the compensation diagnostics
    #[must_use]
    pub fn saga_step(
        saga: impl Into<String>,
        step: impl Into<String>,
        index: usize,
        source: Error,
        compensation_failures: Vec<String>,
    ) -> Self {
        Error::SagaStep {
            saga: saga.into(),
            step: step.into(),
            index,
            source: Box::new(source),
            compensation_failures,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }
}
