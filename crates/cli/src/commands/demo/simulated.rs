//! In-process stand-in for a remote dependency

use async_trait::async_trait;
use relaykit_core::CallContext;
use relaykit_utils::resilience::{Request, Response, Transport, TransportError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::debug;

/// Answers `503` for its first `failures` requests, then `200`
#[derive(Debug)]
pub struct SimulatedDependency {
    name: String,
    failures: u32,
    latency: Duration,
    served: AtomicU32,
}

impl SimulatedDependency {
    pub fn new(name: impl Into<String>, failures: u32) -> Self {
        Self {
            name: name.into(),
            failures,
            latency: Duration::from_millis(5),
            served: AtomicU32::new(0),
        }
    }

    pub fn healthy(name: impl Into<String>) -> Self {
        Self::new(name, 0)
    }

    pub fn down(name: impl Into<String>) -> Self {
        Self::new(name, u32::MAX)
    }

    pub fn served(&self) -> u32 {
        self.served.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for SimulatedDependency {
    async fn send(
        &self,
        _ctx: &CallContext,
        request: &Request,
    ) -> Result<Response, TransportError> {
        tokio::time::sleep(self.latency).await;
        let n = self.served.fetch_add(1, Ordering::Relaxed);
        debug!(dependency = %self.name, method = %request.method, target = %request.target, n, "simulated request");

        if n < self.failures {
            Err(TransportError::status(
                503,
                format!("{} is unavailable", self.name),
            ))
        } else {
            Ok(Response::ok().with_body(format!("{} {}", request.method, request.target)))
        }
    }
}
