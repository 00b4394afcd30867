//! Caller-supplied deadline and cancellation carried through every entry point
//!
//! A [`CallContext`] is the Rust rendition of a request context: it bundles an
//! optional absolute deadline, a cancellation token and an optional
//! correlation id. Every suspension point in relaykit (network I/O, backoff
//! sleeps, broker hand-off) races against [`CallContext::done`], so an expired
//! deadline or a cancellation aborts the in-progress wait instead of being
//! noticed at the next loop boundary.

use crate::errors::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Why a context stopped admitting work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    DeadlineExceeded,
    Cancelled,
}

/// Deadline, cancellation and correlation for one logical operation
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Option<Instant>,
    budget: Option<Duration>,
    cancellation: CancellationToken,
    correlation_id: Option<String>,
}

impl CallContext {
    /// A context with no deadline and a fresh cancellation token
    #[must_use]
    pub fn new() -> Self {
        Self {
            deadline: None,
            budget: None,
            cancellation: CancellationToken::new(),
            correlation_id: None,
        }
    }

    /// A context whose deadline is `timeout` from now
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().timeout(timeout)
    }

    /// Tighten the deadline to `timeout` from now; an earlier existing deadline wins
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let mut ctx = self.deadline_at(deadline);
        if ctx.deadline == Some(deadline) {
            ctx.budget = Some(timeout);
        }
        ctx
    }

    /// Tighten the deadline to an absolute instant; an earlier existing deadline wins
    #[must_use]
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        match self.deadline {
            Some(current) if current <= deadline => {}
            _ => {
                self.deadline = Some(deadline);
                self.budget = None;
            }
        }
        self
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Same deadline; cancelled when this context is, but can be cancelled on its own
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            deadline: self.deadline,
            budget: self.budget,
            cancellation: self.cancellation.child_token(),
            correlation_id: self.correlation_id.clone(),
        }
    }

    /// Keeps only the correlation id; neither the deadline nor cancellation carry over.
    /// Used for work that must run after the caller gave up, such as compensation.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            deadline: None,
            budget: None,
            cancellation: CancellationToken::new(),
            correlation_id: self.correlation_id.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fail with the matching taxonomy error if the context already finished
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(self.abort_error(DoneReason::Cancelled, operation));
        }
        if self.is_expired() {
            return Err(self.abort_error(DoneReason::DeadlineExceeded, operation));
        }
        Ok(())
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) -> DoneReason {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.cancellation.cancelled() => DoneReason::Cancelled,
                    _ = sleep_until(deadline) => DoneReason::DeadlineExceeded,
                }
            }
            None => {
                self.cancellation.cancelled().await;
                DoneReason::Cancelled
            }
        }
    }

    /// Translate a [`DoneReason`] into the error callers see
    pub fn abort_error(&self, reason: DoneReason, operation: &str) -> Error {
        match reason {
            DoneReason::DeadlineExceeded => Error::deadline_exceeded(operation, self.budget),
            DoneReason::Cancelled => Error::cancelled(operation),
        }
    }

    /// Drive `future` to completion unless the context finishes first
    pub async fn run<F, T>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check(operation)?;
        tokio::select! {
            biased;
            reason = self.done() => Err(self.abort_error(reason, operation)),
            result = future => result,
        }
    }

    /// Sleep that wakes early with an error when the context finishes
    pub async fn sleep(&self, duration: Duration, operation: &str) -> Result<()> {
        self.run(operation, async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_is_cut_short_by_deadline() {
        let ctx = CallContext::with_timeout(Duration::from_millis(100));
        let started = Instant::now();

        let result = ctx.sleep(Duration::from_secs(10), "backoff").await;

        assert!(matches!(result, Err(Error::DeadlineExceeded { .. })));
        assert_eq!(started.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_run() {
        let ctx = CallContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            canceller.cancel();
        });

        let result: Result<()> = ctx
            .run("invoke", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(Error::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_earlier_deadline_wins() {
        let ctx = CallContext::with_timeout(Duration::from_millis(50)).timeout(Duration::from_secs(5));
        let remaining = ctx.remaining().expect("deadline set");
        assert!(remaining <= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_child_follows_parent_cancellation_but_not_reverse() {
        let parent = CallContext::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());

        let other_child = parent.child();
        parent.cancel();
        assert!(other_child.is_cancelled());
    }

    #[tokio::test]
    async fn test_detached_drops_deadline_and_cancellation() {
        let ctx = CallContext::with_timeout(Duration::from_millis(1)).with_correlation_id("order-7");
        ctx.cancel();

        let detached = ctx.detached();
        assert!(!detached.is_cancelled());
        assert!(detached.deadline().is_none());
        assert_eq!(detached.correlation_id(), Some("order-7"));
    }

    #[tokio::test]
    async fn test_check_reports_expired_deadline() {
        let ctx = CallContext::new().deadline_at(Instant::now());
        let err = ctx.check("publish").unwrap_err();
        assert!(err.is_deadline_exceeded());
    }
}
