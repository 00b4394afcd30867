//! Subscriber handlers

use crate::event::Event;
use async_trait::async_trait;
use relaykit_core::{BoxError, CallContext};
use serde::Serialize;
use std::fmt::{self, Display};
use std::future::Future;
use std::marker::PhantomData;
use uuid::Uuid;

/// Trait for event subscribers
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one event. `ctx` is cancelled when the bus abandons in-flight
    /// work at the end of its shutdown grace period.
    async fn handle(&self, ctx: &CallContext, event: &Event) -> Result<(), BoxError>;
}

/// Adapts an async closure into an [`EventHandler`]
pub struct FnHandler<F, Fut> {
    handler: F,
    _future: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnHandler<F, Fut>
where
    F: Fn(CallContext, Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _future: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F, Fut>
where
    F: Fn(CallContext, Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    async fn handle(&self, ctx: &CallContext, event: &Event) -> Result<(), BoxError> {
        (self.handler)(ctx.clone(), event.clone()).await
    }
}

/// Identifier of one subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
