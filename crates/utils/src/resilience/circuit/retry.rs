//! Retry logic for resilient operations.

use super::config::RetryPolicy;
use super::state::CircuitBreaker;
use super::types::Outcome;
use relaykit_core::{CallContext, Error, Result};
use std::future::Future;
use tracing::{debug, warn};

/// Execute an operation with retry logic.
///
/// `operation` receives the zero-based attempt number. Every attempt and every
/// backoff sleep is bounded by `ctx`: a deadline surfaces as
/// `DeadlineExceeded`, a cancellation as `Cancelled`. Errors the policy does
/// not retry are returned as is; once the budget is spent the last error is
/// wrapped in `RetriesExhausted`.
pub async fn retry<F, Fut, T>(
    policy: &RetryPolicy,
    ctx: &CallContext,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        match ctx.run(operation_name, operation(attempt)).await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        retries = attempt,
                        "operation succeeded after retries"
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if !policy.should_retry(&error) {
                    return Err(error);
                }
                if attempt >= policy.max_retries {
                    warn!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        error = %error,
                        "retry budget exhausted"
                    );
                    return Err(Error::retries_exhausted(operation_name, attempt + 1, error));
                }

                let delay = policy.delay_for(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts = policy.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "attempt failed, backing off"
                );
                ctx.sleep(delay, operation_name).await?;
                attempt += 1;
            }
        }
    }
}

/// Retry with circuit breaker protection.
///
/// Each attempt goes through `breaker` with the default error accounting of
/// [`Outcome::for_error`]; a rejection by the breaker ends the loop at once.
pub async fn retry_with_circuit_breaker<F, Fut, T>(
    policy: &RetryPolicy,
    breaker: &CircuitBreaker,
    ctx: &CallContext,
    operation: F,
) -> Result<T>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let operation = &operation;
    retry(policy, ctx, breaker.name(), |attempt| {
        breaker.call_with(move || operation(attempt), Outcome::for_error)
    })
    .await
}
