//! Logging for meridian.
//!
//! Library crates log through the re-exported `tracing` macros with structured
//! fields. Binaries pick one of the `init_*` functions once at startup.

pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};
pub use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type InitResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Initialize the global subscriber with JSON output
///
/// The filter comes from `RUST_LOG`, falling back to `info`.
pub fn init_tracing() -> InitResult {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    install_json(filter)
}

/// Initialize the global subscriber with an explicit filter directive
///
/// `RUST_LOG` still wins when it is set.
pub fn init_tracing_with_level(level: &str) -> InitResult {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    install_json(filter)
}

/// Initialize tracing for tests, writing through the test harness capture
pub fn init_tracing_test() -> InitResult {
    tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(fmt::layer().with_test_writer())
        .try_init()?;

    Ok(())
}

fn install_json(filter: EnvFilter) -> InitResult {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .json(),
        )
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_macros() {
        info!(signer = "alice", "info message");
        debug!(batch = 1, "debug message");
        warn!("warning message");
        error!("error message");
    }

    #[test]
    fn test_second_init_fails() {
        // whichever init runs first in this process wins
        let _ = init_tracing_test();
        assert!(init_tracing_test().is_err());
    }
}
