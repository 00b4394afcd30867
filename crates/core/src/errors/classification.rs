//! Classification of errors into the taxonomy the retry loop and callers act on

use super::types::Error;
use serde::Serialize;
use std::fmt;

/// Taxonomy class of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CircuitOpen,
    Retryable,
    NonRetryable,
    DeadlineExceeded,
    Cancelled,
    RetriesExhausted,
    Handler,
    Publish,
    SagaStep,
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::Retryable => "retryable",
            ErrorKind::NonRetryable => "non_retryable",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::RetriesExhausted => "retries_exhausted",
            ErrorKind::Handler => "handler",
            ErrorKind::Publish => "publish",
            ErrorKind::SagaStep => "saga_step",
            ErrorKind::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

impl Error {
    /// The taxonomy class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Error::Retryable { .. } | Error::AttemptTimeout { .. } => ErrorKind::Retryable,
            Error::NonRetryable { .. } => ErrorKind::NonRetryable,
            Error::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
            Error::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            Error::Handler { .. } => ErrorKind::Handler,
            Error::Publish { .. } => ErrorKind::Publish,
            Error::SagaStep { .. } => ErrorKind::SagaStep,
            Error::Configuration { .. } | Error::Json { .. } => ErrorKind::Configuration,
        }
    }

    /// Transient failures that a retry may resolve
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }

    /// Errors that must stop a retry sequence no matter what the retry predicate says
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::CircuitOpen | ErrorKind::DeadlineExceeded | ErrorKind::Cancelled
        )
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Error::CircuitOpen { .. })
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Error::DeadlineExceeded { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Caller-side outcomes that say nothing about the health of a dependency
    pub fn is_caller_abort(&self) -> bool {
        matches!(
            self,
            Error::DeadlineExceeded { .. } | Error::Cancelled { .. }
        )
    }

    /// Number of attempts recorded on a retry-exhaustion error
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Error::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Unwrap retry and saga wrappers down to the originally observed failure
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::RetriesExhausted { last, .. } => last.root_cause(),
            Error::SagaStep { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
