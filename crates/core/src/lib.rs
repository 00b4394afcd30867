//! Core types, errors, and constants shared by every relaykit crate.
//!
//! ## Key Components
//!
//! - **`errors`**: The failure taxonomy (`Error`, `ErrorKind`) every component
//!   reports through, plus classification helpers used by the retry loop.
//! - **`context`**: `CallContext`, the deadline/cancellation token accepted by
//!   every public entry point.
//! - **`constants`**: Shared static values such as the environment prefix.

pub mod constants;
pub mod context;
pub mod errors;

pub use self::{
    constants::*,
    context::{CallContext, DoneReason},
    errors::{BoxError, Error, ErrorKind, Result},
};
