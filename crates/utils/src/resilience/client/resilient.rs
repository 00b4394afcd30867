//! Outbound client combining a per-attempt timeout, bounded retries and a
//! circuit breaker

use super::request::{Request, Response};
use super::transport::{Transport, TransportError};
use crate::resilience::circuit::{retry, CircuitBreaker, CircuitBreakerConfig, Outcome, RetryPolicy};
use crate::resilience::registry::BreakerRegistry;
use relaykit_config::ResolvedDependency;
use relaykit_core::{CallContext, Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info_span, Instrument};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for one named dependency.
///
/// `invoke` runs up to `max_retries + 1` attempts. Each attempt goes through
/// the dependency's breaker and is bounded by the per-call timeout; the whole
/// sequence, backoff sleeps included, is bounded by the caller's context.
pub struct ResilientClient {
    dependency: String,
    transport: Arc<dyn Transport>,
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
    call_timeout: Duration,
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("dependency", &self.dependency)
            .field("policy", &self.policy)
            .field("call_timeout", &self.call_timeout)
            .field("breaker_state", &self.breaker.state())
            .finish()
    }
}

impl ResilientClient {
    pub fn builder(dependency: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(dependency)
    }

    pub fn dependency(&self) -> &str {
        &self.dependency
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `request` to the dependency
    pub async fn invoke(&self, ctx: &CallContext, request: Request) -> Result<Response> {
        let request = &request;
        retry(&self.policy, ctx, &self.dependency, |attempt| {
            let span = info_span!(
                "attempt",
                dependency = %self.dependency,
                method = %request.method,
                target = %request.target,
                attempt = attempt + 1,
            );
            self.breaker
                .call_with(move || self.attempt(ctx, request), Outcome::for_error)
                .instrument(span)
        })
        .await
    }

    async fn attempt(&self, ctx: &CallContext, request: &Request) -> Result<Response> {
        let attempt_ctx = ctx.child().timeout(self.call_timeout);
        let sent = tokio::time::timeout(
            self.call_timeout,
            self.transport.send(&attempt_ctx, request),
        )
        .await;

        match sent {
            Err(_) => Err(Error::attempt_timeout(&self.dependency, self.call_timeout)),
            Ok(Err(error)) => Err(error.classify(&self.dependency)),
            Ok(Ok(response)) if response.is_success() => {
                debug!(status = response.status, "attempt succeeded");
                Ok(response)
            }
            Ok(Ok(response)) => {
                let message = String::from_utf8_lossy(&response.body).into_owned();
                Err(TransportError::status(response.status, message).classify(&self.dependency))
            }
        }
    }
}

/// Assembles a [`ResilientClient`]
pub struct ClientBuilder {
    dependency: String,
    transport: Option<Arc<dyn Transport>>,
    breaker: Option<Arc<CircuitBreaker>>,
    policy: RetryPolicy,
    call_timeout: Duration,
}

impl ClientBuilder {
    pub fn new(dependency: impl Into<String>) -> Self {
        Self {
            dependency: dependency.into(),
            transport: None,
            breaker: None,
            policy: RetryPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Use an explicit breaker
    pub fn breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Share the registry's breaker for this dependency
    pub fn registry(mut self, registry: &BreakerRegistry) -> Self {
        self.breaker = Some(registry.get_or_create(&self.dependency));
        self
    }

    /// Apply the retry policy and call timeout resolved from configuration
    pub fn settings(mut self, settings: &ResolvedDependency) -> Self {
        self.policy = RetryPolicy::from(&settings.retry);
        self.call_timeout = settings.client.call_timeout();
        self
    }

    pub fn build(self) -> Result<ResilientClient> {
        let transport = self.transport.ok_or_else(|| {
            Error::configuration(format!(
                "no transport configured for dependency '{}'",
                self.dependency
            ))
        })?;
        if self.call_timeout.is_zero() {
            return Err(Error::configuration(format!(
                "call timeout for dependency '{}' must be greater than zero",
                self.dependency
            )));
        }

        let breaker = self.breaker.unwrap_or_else(|| {
            Arc::new(CircuitBreaker::new(
                self.dependency.clone(),
                CircuitBreakerConfig::default(),
            ))
        });

        Ok(ResilientClient {
            dependency: self.dependency,
            transport,
            breaker,
            policy: self.policy,
            call_timeout: self.call_timeout,
        })
    }
}
