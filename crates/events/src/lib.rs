//! Topic-addressed asynchronous event bus for relaykit services.
//!
//! ## Key Components
//!
//! - **`bus`**: `EventBus`, the publish/subscribe hub with per-subscriber
//!   workers and a bounded shutdown.
//! - **`event`**: The immutable `Event` envelope.
//! - **`handler`**: The `EventHandler` trait subscribers implement.
//! - **`topic`**: Topic names and the patterns subscriptions match with.
//! - **`transport`**: The broker port and its in-memory implementation.

pub mod bus;
pub mod event;
pub mod handler;
pub mod stats;
pub mod topic;
pub mod transport;

pub use self::{
    bus::{BusConfig, BusState, EventBus},
    event::Event,
    handler::{EventHandler, FnHandler, SubscriptionId},
    stats::{BusStats, HandlerFailure},
    topic::{Topic, TopicPattern},
    transport::{InMemoryTransport, Transport},
};
