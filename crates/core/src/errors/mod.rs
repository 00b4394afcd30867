//! Error taxonomy shared by every relaykit component

mod builders;
mod classification;
mod conversions;
mod display;
mod types;

pub use classification::ErrorKind;
pub use types::{BoxError, Error, Result};
