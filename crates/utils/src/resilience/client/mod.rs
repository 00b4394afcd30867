//! Resilient outbound client
//!
//! - [`request`] - `Request` / `Response` values
//! - [`transport`] - the `Transport` port and classification of its errors
//! - [`resilient`] - `ResilientClient` and its builder

pub mod request;
pub mod resilient;
pub mod transport;

pub use request::{Method, Request, Response};
pub use resilient::{ClientBuilder, ResilientClient};
pub use transport::{FnTransport, Transport, TransportError, TransportErrorKind};
