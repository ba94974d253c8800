//! Logging setup.
//!
//! All output goes to stderr: stdout carries the handshake line the host
//! parses, and anything else printed there breaks provider startup. Levels
//! are controlled with `RUST_LOG` (e.g. `hemmer_provider_azure=debug`).

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Initialize the logging subscriber, defaulting to `info` when
/// `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set; use
/// [`try_init_logging`] where that can happen.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`], with an explicit default level used when
/// `RUST_LOG` is unset.
pub fn init_logging_with_default(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging; returns false when a subscriber is already
/// installed instead of panicking. Used by tests.
pub fn try_init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be set once per process, so only the
    // filter parsing is testable here.
    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("hemmer_provider_azure=debug").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_provider_azure=debug").is_ok());
    }
}
