//! Topic-addressed asynchronous event bus
//!
//! Publishers hand events to a [`Transport`] and return as soon as it accepted
//! them. A dispatch task reads accepted events in order and routes each one to
//! the mailbox of every matching subscription. Each subscription has its own
//! worker task, so handlers run independently of each other: a slow, failing
//! or panicking handler never holds up its siblings or the publisher, and each
//! subscriber sees events in the order they were accepted.
//!
//! The transport queue is bounded, but subscriber mailboxes are not: a stuck
//! handler lets its mailbox grow while siblings keep up. The backlog is
//! reported as [`BusStats::pending`].
//!
//! Delivery is at-most-once. A handler failure is logged and recorded but the
//! event is not redelivered; events still queued when the shutdown grace
//! period runs out are dropped and counted as abandoned.

use crate::event::Event;
use crate::handler::{EventHandler, FnHandler, SubscriptionId};
use crate::stats::{BusMetrics, BusStats, FailureLog, HandlerFailure};
use crate::topic::{Topic, TopicPattern};
use crate::transport::{InMemoryTransport, Transport};
use chrono::Utc;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use relaykit_config::RelayConfig;
use relaykit_core::{BoxError, CallContext, Error, Result, DEFAULT_SERVICE_NAME};
use relaykit_utils::tracing::dispatch_span;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

/// Lifecycle of a bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BusState {
    /// Accepting subscriptions and publishes; nothing is dispatched yet
    Created,
    Running,
    /// Publishing fails; stopping again is a no-op
    Stopped,
}

impl fmt::Display for BusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusState::Created => f.write_str("created"),
            BusState::Running => f.write_str("running"),
            BusState::Stopped => f.write_str("stopped"),
        }
    }
}

/// Bus settings
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Producing-service name stamped on every event
    pub source: String,
    /// Time in-flight handlers get to finish after `stop`
    pub shutdown_grace: Duration,
    /// Number of recent handler failures kept
    pub failure_history: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SERVICE_NAME.to_string(),
            shutdown_grace: Duration::from_secs(5),
            failure_history: 100,
        }
    }
}

impl From<&RelayConfig> for BusConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            source: config.service_name.clone(),
            shutdown_grace: config.bus.shutdown_grace(),
            failure_history: config.bus.failure_history,
        }
    }
}

struct Subscription {
    id: SubscriptionId,
    name: String,
    pattern: TopicPattern,
    handler: Arc<dyn EventHandler>,
    mailbox: Mutex<Option<mpsc::UnboundedSender<Arc<Event>>>>,
    /// Held until a worker is spawned for this subscription
    inbox: Mutex<Option<mpsc::UnboundedReceiver<Arc<Event>>>>,
}

impl Subscription {
    /// Queue `event` for the worker; false once the mailbox is closed
    fn deliver(&self, event: Arc<Event>) -> bool {
        match self.mailbox.lock().as_ref() {
            Some(mailbox) => mailbox.send(event).is_ok(),
            None => false,
        }
    }

    fn close_mailbox(&self) {
        self.mailbox.lock().take();
    }
}

struct BusInner {
    config: BusConfig,
    transport: Arc<dyn Transport>,
    state: Mutex<BusState>,
    subscriptions: RwLock<Vec<Arc<Subscription>>>,
    workers: Mutex<JoinSet<()>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    runtime: Mutex<Option<Handle>>,
    /// Parent of every handler context; cancelled when grace expires
    handler_token: CancellationToken,
    metrics: BusMetrics,
    failures: FailureLog,
}

/// Asynchronous publish/subscribe bus. Cloning shares the same bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("source", &self.inner.config.source)
            .field("state", &self.state())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

impl EventBus {
    /// Create a bus over `transport`
    pub fn new(config: BusConfig, transport: Arc<dyn Transport>) -> Self {
        let failures = FailureLog::new(config.failure_history);
        Self {
            inner: Arc::new(BusInner {
                config,
                transport,
                state: Mutex::new(BusState::Created),
                subscriptions: RwLock::new(Vec::new()),
                workers: Mutex::new(JoinSet::new()),
                dispatcher: Mutex::new(None),
                runtime: Mutex::new(None),
                handler_token: CancellationToken::new(),
                metrics: BusMetrics::default(),
                failures,
            }),
        }
    }

    /// Create a bus over a bounded in-memory queue of `capacity` events
    pub fn in_memory(config: BusConfig, capacity: usize) -> Self {
        Self::new(config, Arc::new(InMemoryTransport::new(capacity)))
    }

    /// Create an in-memory bus from the service configuration
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::in_memory(BusConfig::from(config), config.bus.queue_capacity)
    }

    pub fn state(&self) -> BusState {
        *self.inner.state.lock()
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.read().len()
    }

    pub fn stats(&self) -> BusStats {
        self.inner.metrics.snapshot(self.subscription_count())
    }

    /// Most recent handler failures, oldest first
    pub fn recent_failures(&self) -> Vec<HandlerFailure> {
        self.inner.failures.recent()
    }

    /// Publish `payload` to `topic`.
    ///
    /// Returns the event once the transport accepted it; handlers run later.
    /// The event carries the context's correlation id. Waiting for transport
    /// capacity is bounded by `ctx`.
    pub async fn publish<T: Serialize>(
        &self,
        ctx: &CallContext,
        topic: &str,
        payload: T,
    ) -> Result<Event> {
        let topic = Topic::new(topic)?;
        let payload = serde_json::to_value(payload).map_err(|e| {
            Error::publish(topic.as_str(), format!("payload is not serializable: {e}"))
        })?;
        let mut event = Event::new(topic.as_str(), &self.inner.config.source, payload);
        if let Some(correlation_id) = ctx.correlation_id() {
            event = event.with_correlation_id(correlation_id);
        }
        self.send(ctx, event).await
    }

    /// Publish a prebuilt event.
    ///
    /// Topic, payload, correlation id and metadata are kept; every call gets a
    /// fresh id and timestamp, and the source is this bus's service.
    pub async fn publish_event(&self, ctx: &CallContext, event: Event) -> Result<Event> {
        let event = event.restamp(&self.inner.config.source);
        self.send(ctx, event).await
    }

    async fn send(&self, ctx: &CallContext, event: Event) -> Result<Event> {
        if self.state() == BusState::Stopped {
            return Err(Error::publish(event.topic(), "event bus is stopped"));
        }
        Topic::new(event.topic())?;

        self.inner.transport.send(ctx, event.clone()).await?;
        self.inner.metrics.published.fetch_add(1, Ordering::Relaxed);
        debug!(topic = event.topic(), event_id = %event.id(), "event published");
        Ok(event)
    }

    /// Register `handler` for every topic matching `pattern`
    pub fn subscribe(
        &self,
        pattern: &str,
        name: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<SubscriptionId> {
        let pattern = TopicPattern::parse(pattern)?;
        let name = name.into();

        let state = self.inner.state.lock();
        if *state == BusState::Stopped {
            return Err(Error::configuration(format!(
                "cannot subscribe '{name}' to a stopped event bus"
            )));
        }

        let (mailbox, inbox) = mpsc::unbounded_channel();
        let subscription = Arc::new(Subscription {
            id: SubscriptionId::new(),
            name,
            pattern,
            handler,
            mailbox: Mutex::new(Some(mailbox)),
            inbox: Mutex::new(Some(inbox)),
        });
        let id = subscription.id;

        self.inner
            .subscriptions
            .write()
            .push(Arc::clone(&subscription));
        if *state == BusState::Running {
            self.spawn_worker(&subscription);
        }
        debug!(
            subscription = %id,
            subscriber = %subscription.name,
            pattern = %subscription.pattern,
            "subscriber registered"
        );

        Ok(id)
    }

    /// Register an async closure as a handler
    pub fn subscribe_fn<F, Fut>(
        &self,
        pattern: &str,
        name: impl Into<String>,
        handler: F,
    ) -> Result<SubscriptionId>
    where
        F: Fn(CallContext, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        self.subscribe(pattern, name, Arc::new(FnHandler::new(handler)))
    }

    /// Remove a subscription. Events already in its mailbox are still handled.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut subscriptions = self.inner.subscriptions.write();
            subscriptions
                .iter()
                .position(|s| s.id == id)
                .map(|index| subscriptions.remove(index))
        };

        match removed {
            Some(subscription) => {
                subscription.close_mailbox();
                debug!(subscription = %id, subscriber = %subscription.name, "subscriber removed");
                true
            }
            None => false,
        }
    }

    /// Start dispatching.
    ///
    /// Events published before `start` are delivered now. Dispatching also
    /// ends when `ctx` finishes; the transport is then closed so further
    /// publishes fail, and `stop` still bounds the remaining handler work.
    pub async fn start(&self, ctx: &CallContext) -> Result<()> {
        let mut state = self.inner.state.lock();
        match *state {
            BusState::Created => {}
            BusState::Running => {
                return Err(Error::configuration("event bus is already running"))
            }
            BusState::Stopped => {
                return Err(Error::configuration("event bus has been stopped"))
            }
        }

        let runtime = Handle::current();
        *self.inner.runtime.lock() = Some(runtime.clone());

        let subscriptions = self.inner.subscriptions.read().clone();
        for subscription in &subscriptions {
            self.spawn_worker(subscription);
        }

        let dispatcher = runtime.spawn(dispatch_loop(Arc::clone(&self.inner), ctx.clone()));
        *self.inner.dispatcher.lock() = Some(dispatcher);
        *state = BusState::Running;

        info!(
            source = %self.inner.config.source,
            subscriptions = subscriptions.len(),
            "event bus started"
        );
        Ok(())
    }

    /// Stop the bus.
    ///
    /// Publishing fails from now on. Accepted events are still routed and
    /// in-flight handlers get the shutdown grace period to finish; after that
    /// their contexts are cancelled and their tasks aborted. Idempotent.
    pub async fn stop(&self) {
        let previous = {
            let mut state = self.inner.state.lock();
            std::mem::replace(&mut *state, BusState::Stopped)
        };
        if previous == BusState::Stopped {
            return;
        }

        self.inner.transport.close().await;
        let grace = self.inner.config.shutdown_grace;

        if previous == BusState::Created {
            // Nothing was dispatched; whatever the transport holds is dropped
            let mut dropped = 0u64;
            let _ = tokio::time::timeout(grace, async {
                while self.inner.transport.receive().await.is_some() {
                    dropped += 1;
                }
            })
            .await;
            self.inner
                .metrics
                .abandoned
                .fetch_add(dropped, Ordering::Relaxed);
            info!(abandoned = dropped, "event bus stopped before start");
            return;
        }

        let mut dispatcher = self.inner.dispatcher.lock().take();
        let mut workers = std::mem::take(&mut *self.inner.workers.lock());

        let drained = tokio::time::timeout(grace, async {
            if let Some(dispatcher) = dispatcher.as_mut() {
                let _ = dispatcher.await;
            }
            while workers.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            self.inner.handler_token.cancel();
            if let Some(dispatcher) = dispatcher {
                dispatcher.abort();
                let _ = dispatcher.await;
            }
            for subscription in self.inner.subscriptions.read().iter() {
                subscription.close_mailbox();
            }
            workers.abort_all();
            while workers.join_next().await.is_some() {}

            // Accepted but never routed
            let mut unrouted = 0u64;
            while self.inner.transport.receive().await.is_some() {
                unrouted += 1;
            }

            let abandoned = self.inner.metrics.pending.swap(0, Ordering::Relaxed) + unrouted;
            self.inner
                .metrics
                .abandoned
                .fetch_add(abandoned, Ordering::Relaxed);
            warn!(
                grace_ms = grace.as_millis() as u64,
                abandoned, "shutdown grace expired, abandoning in-flight handlers"
            );
        }

        let stats = self.stats();
        info!(
            published = stats.published,
            delivered = stats.delivered,
            handler_failures = stats.handler_failures,
            abandoned = stats.abandoned,
            "event bus stopped"
        );
    }

    /// Must be called with the state lock held
    fn spawn_worker(&self, subscription: &Arc<Subscription>) {
        let Some(inbox) = subscription.inbox.lock().take() else {
            return;
        };
        let Some(runtime) = self.inner.runtime.lock().clone() else {
            return;
        };
        let worker = run_worker(Arc::clone(&self.inner), Arc::clone(subscription), inbox);
        self.inner.workers.lock().spawn_on(worker, &runtime);
    }
}

async fn dispatch_loop(inner: Arc<BusInner>, ctx: CallContext) {
    let mut closing = false;
    loop {
        let received = tokio::select! {
            biased;
            _ = ctx.done(), if !closing => {
                // Already accepted events are still routed
                debug!("dispatch context finished, closing transport");
                inner.transport.close().await;
                closing = true;
                continue;
            }
            event = inner.transport.receive() => event,
        };
        let Some(event) = received else {
            break;
        };

        let event = Arc::new(event);
        let subscriptions = inner.subscriptions.read().clone();
        let mut routed = 0usize;
        for subscription in subscriptions
            .iter()
            .filter(|s| s.pattern.matches(event.topic()))
        {
            inner.metrics.pending.fetch_add(1, Ordering::Relaxed);
            if subscription.deliver(Arc::clone(&event)) {
                routed += 1;
            } else {
                inner.metrics.pending.fetch_sub(1, Ordering::Relaxed);
            }
        }

        if routed == 0 {
            debug!(topic = event.topic(), event_id = %event.id(), "no subscribers for event");
        }
    }

    // Workers drain what is already queued and then exit
    for subscription in inner.subscriptions.read().iter() {
        subscription.close_mailbox();
    }
}

async fn run_worker(
    inner: Arc<BusInner>,
    subscription: Arc<Subscription>,
    mut inbox: mpsc::UnboundedReceiver<Arc<Event>>,
) {
    while let Some(event) = inbox.recv().await {
        let event_id = event.id().to_string();
        let span = dispatch_span(event.topic(), &subscription.name, &event_id);

        let mut ctx = CallContext::new().with_cancellation(inner.handler_token.child_token());
        if let Some(correlation_id) = event.correlation_id() {
            ctx = ctx.with_correlation_id(correlation_id);
        }

        let outcome = AssertUnwindSafe(subscription.handler.handle(&ctx, &event))
            .catch_unwind()
            .instrument(span)
            .await;
        inner.metrics.pending.fetch_sub(1, Ordering::Relaxed);

        match outcome {
            Ok(Ok(())) => {
                inner.metrics.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                inner
                    .metrics
                    .handler_failures
                    .fetch_add(1, Ordering::Relaxed);
                record_failure(&inner, &subscription, &event, e.to_string(), false);
            }
            Err(panic) => {
                inner.metrics.handler_panics.fetch_add(1, Ordering::Relaxed);
                record_failure(&inner, &subscription, &event, panic_message(&*panic), true);
            }
        }
    }
}

fn record_failure(
    inner: &BusInner,
    subscription: &Subscription,
    event: &Event,
    message: String,
    panicked: bool,
) {
    let error = Error::handler(event.topic(), &subscription.name, &message);
    error!(
        subscription = %subscription.id,
        event_id = %event.id(),
        panicked,
        error = %error,
        "event handler failed"
    );
    inner.failures.record(HandlerFailure {
        topic: event.topic().to_string(),
        subscriber: subscription.name.clone(),
        subscription: subscription.id,
        event_id: event.id(),
        message,
        panicked,
        at: Utc::now(),
    });
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
