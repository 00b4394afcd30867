//! Broker transport port and the in-memory broker

use crate::event::Event;
use async_trait::async_trait;
use parking_lot::Mutex;
use relaykit_core::{CallContext, Error, Result};
use tokio::sync::mpsc;
use tracing::debug;

/// Broker the bus publishes into and consumes from.
///
/// `send` returning `Ok` means the broker accepted the event. `receive` yields
/// accepted events in acceptance order and `None` once the broker is closed
/// and drained.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, ctx: &CallContext, event: Event) -> Result<()>;

    async fn receive(&self) -> Option<Event>;

    /// Stop accepting events; already accepted events remain receivable
    async fn close(&self);
}

/// Bounded in-process queue
pub struct InMemoryTransport {
    sender: Mutex<Option<mpsc::Sender<Event>>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Event>>,
    capacity: usize,
}

impl InMemoryTransport {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: tokio::sync::Mutex::new(receiver),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    /// Waits for queue capacity, bounded by the caller's context
    async fn send(&self, ctx: &CallContext, event: Event) -> Result<()> {
        let topic = event.topic().to_string();
        let sender = self
            .sender
            .lock()
            .clone()
            .ok_or_else(|| Error::publish(&topic, "transport is closed"))?;

        ctx.run("publish", async {
            sender
                .send(event)
                .await
                .map_err(|_| Error::publish(&topic, "transport is closed"))
        })
        .await
    }

    async fn receive(&self) -> Option<Event> {
        self.receiver.lock().await.recv().await
    }

    async fn close(&self) {
        if self.sender.lock().take().is_some() {
            debug!("in-memory transport closed");
        }
    }
}
