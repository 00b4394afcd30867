//! Dispatch statistics and the recent-failure log

use crate::handler::SubscriptionId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Snapshot of bus activity since creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Events accepted by the transport
    pub published: u64,
    /// Handler invocations that completed successfully
    pub delivered: u64,
    /// Handler invocations that returned an error
    pub handler_failures: u64,
    /// Handler invocations that panicked
    pub handler_panics: u64,
    /// Deliveries dropped because shutdown grace expired
    pub abandoned: u64,
    /// Deliveries sitting in subscriber mailboxes or being handled
    pub pending: u64,
    pub subscriptions: usize,
}

/// One failed handler invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerFailure {
    pub topic: String,
    pub subscriber: String,
    pub subscription: SubscriptionId,
    pub event_id: Uuid,
    pub message: String,
    pub panicked: bool,
    pub at: DateTime<Utc>,
}

/// Lock-free counters behind [`BusStats`]
#[derive(Debug, Default)]
pub(crate) struct BusMetrics {
    pub published: AtomicU64,
    pub delivered: AtomicU64,
    pub handler_failures: AtomicU64,
    pub handler_panics: AtomicU64,
    pub abandoned: AtomicU64,
    /// Deliveries routed to a mailbox and not yet finished
    pub pending: AtomicU64,
}

impl BusMetrics {
    pub fn snapshot(&self, subscriptions: usize) -> BusStats {
        BusStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            pending: self.pending.load(Ordering::Relaxed),
            subscriptions,
        }
    }
}

/// Bounded ring of the most recent handler failures
#[derive(Debug)]
pub(crate) struct FailureLog {
    capacity: usize,
    entries: Mutex<VecDeque<HandlerFailure>>,
}

impl FailureLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn record(&self, failure: HandlerFailure) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(failure);
    }

    /// Oldest first
    pub fn recent(&self) -> Vec<HandlerFailure> {
        self.entries.lock().iter().cloned().collect()
    }
}
