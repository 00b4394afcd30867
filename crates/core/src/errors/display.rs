//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CircuitOpen {
                dependency,
                retry_after,
            } => {
                write!(
                    f,
                    "circuit open for '{dependency}': rejecting calls for another {retry_after:?}"
                )
            }
            Error::Retryable {
                dependency,
                message,
                ..
            } => {
                write!(f, "transient failure calling '{dependency}': {message}")
            }
            Error::AttemptTimeout {
                dependency,
                timeout,
            } => {
                write!(f, "call to '{dependency}' timed out after {timeout:?}")
            }
            Error::NonRetryable {
                dependency,
                message,
                ..
            } => {
                write!(f, "request to '{dependency}' rejected: {message}")
            }
            Error::DeadlineExceeded { operation, budget } => match budget {
                Some(budget) => {
                    write!(f, "deadline exceeded for '{operation}' (budget {budget:?})")
                }
                None => write!(f, "deadline exceeded for '{operation}'"),
            },
            Error::Cancelled { operation } => {
                write!(f, "operation '{operation}' was cancelled")
            }
            Error::RetriesExhausted {
                dependency,
                attempts,
                last,
            } => {
                write!(
                    f,
                    "call to '{dependency}' failed after {attempts} attempts: {last}"
                )
            }
            Error::Handler {
                topic,
                subscriber,
                message,
            } => {
                write!(
                    f,
                    "subscriber '{subscriber}' failed to handle '{topic}': {message}"
                )
            }
            Error::Publish { topic, message } => {
                write!(f, "failed to publish to '{topic}': {message}")
            }
            Error::SagaStep {
                saga,
                step,
                index,
                source,
                compensation_failures,
            } => {
                write!(f, "saga '{saga}' failed at step {index} '{step}': {source}")?;
                if !compensation_failures.is_empty() {
                    write!(
                        f,
                        " ({} compensation(s) failed: {})",
                        compensation_failures.len(),
                        compensation_failures.join("; ")
                    )?;
                }
                Ok(())
            }
            Error::Configuration { message } => {
                write!(f, "configuration error: {message}")
            }
            Error::Json { message, .. } => {
                write!(f, "JSON error: {message}")
            }
        }
    }
}
