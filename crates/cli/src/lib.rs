pub mod commands;
mod execute;

pub use commands::Commands;
