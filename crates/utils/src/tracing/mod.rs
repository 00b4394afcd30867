use relaykit_core::{BoxError, RELAYKIT_LOG_VAR};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// The filter comes from `RELAYKIT_LOG` (same syntax as `RUST_LOG`) and
/// defaults to `info`. Output is a compact formatter on stderr.
pub fn init() -> Result<(), BoxError> {
    init_with_default("info")
}

/// Initialize the tracing system with `default_directive` used when
/// `RELAYKIT_LOG` is unset
pub fn init_with_default(default_directive: &str) -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_env(RELAYKIT_LOG_VAR)
        .or_else(|_| EnvFilter::try_new(default_directive))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Check if stderr is attached to a terminal
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Span covering one saga invocation
pub fn saga_span(saga: &str, steps: usize) -> Span {
    span!(Level::INFO, "saga", saga = %saga, steps = steps)
}

/// Span covering one handler invocation on the event bus
pub fn dispatch_span(topic: &str, subscriber: &str, event_id: &str) -> Span {
    span!(
        Level::DEBUG,
        "dispatch",
        topic = %topic,
        subscriber = %subscriber,
        event_id = %event_id
    )
}
