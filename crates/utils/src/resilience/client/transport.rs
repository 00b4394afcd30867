//! Outbound transport port and classification of its failures

use super::request::{Request, Response};
use async_trait::async_trait;
use relaykit_core::{BoxError, CallContext, Error};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

/// What went wrong on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The transport gave up waiting
    Timeout,
    /// Could not connect, or the connection broke
    Connection,
    /// The dependency answered with an error status
    Status(u16),
    /// The request itself was malformed
    InvalidRequest,
    Other,
}

/// Failure reported by a [`Transport`]
#[derive(Debug, thiserror::Error)]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransportErrorKind::Status(status) => write!(f, "status {status}: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connection, message)
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Status(status), message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::InvalidRequest, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Whether another attempt may succeed
    pub fn is_transient(&self) -> bool {
        match self.kind {
            TransportErrorKind::Timeout
            | TransportErrorKind::Connection
            | TransportErrorKind::Other => true,
            TransportErrorKind::Status(status) => {
                status == 408 || status == 429 || status >= 500
            }
            TransportErrorKind::InvalidRequest => false,
        }
    }

    /// Translate into the failure taxonomy for `dependency`
    pub fn classify(self, dependency: &str) -> Error {
        let message = self.to_string();
        if self.is_transient() {
            Error::retryable_with_source(dependency, message, self)
        } else {
            Error::non_retryable_with_source(dependency, message, self)
        }
    }
}

/// Outbound transport supplied by the embedding service.
///
/// `ctx` carries the per-attempt deadline; transports that can bound their own
/// I/O should honor it, but the client enforces it either way.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, ctx: &CallContext, request: &Request) -> Result<Response, TransportError>;
}

/// Adapts an async closure taking an owned request into a [`Transport`]
pub struct FnTransport<F, Fut> {
    send: F,
    _future: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnTransport<F, Fut>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, TransportError>> + Send,
{
    pub fn new(send: F) -> Self {
        Self {
            send,
            _future: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> Transport for FnTransport<F, Fut>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, TransportError>> + Send,
{
    async fn send(&self, _ctx: &CallContext, request: &Request) -> Result<Response, TransportError> {
        (self.send)(request.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaykit_core::ErrorKind;

    #[test]
    fn test_classification() {
        let cases = [
            (TransportError::timeout("read timed out"), ErrorKind::Retryable),
            (TransportError::connection("refused"), ErrorKind::Retryable),
            (TransportError::status(503, "unavailable"), ErrorKind::Retryable),
            (TransportError::status(429, "slow down"), ErrorKind::Retryable),
            (TransportError::status(408, "request timeout"), ErrorKind::Retryable),
            (TransportError::other("unknown"), ErrorKind::Retryable),
            (TransportError::status(404, "not found"), ErrorKind::NonRetryable),
            (TransportError::status(400, "bad request"), ErrorKind::NonRetryable),
            (TransportError::invalid_request("bad header"), ErrorKind::NonRetryable),
        ];

        for (error, expected) in cases {
            let description = error.to_string();
            assert_eq!(error.classify("payments").kind(), expected, "{description}");
        }
    }

    #[test]
    fn test_classified_error_keeps_source() {
        let error = TransportError::status(502, "bad gateway").classify("payments");
        let source = std::error::Error::source(&error).unwrap();
        assert_eq!(source.to_string(), "status 502: bad gateway");
    }

    #[tokio::test]
    async fn test_fn_transport() {
        let transport = FnTransport::new(|request: Request| async move {
            Ok::<_, TransportError>(Response::ok().with_body(request.target))
        });

        let response = transport
            .send(&CallContext::new(), &Request::get("/stock/42"))
            .await
            .unwrap();
        assert_eq!(response.body, "/stock/42");
    }
}
