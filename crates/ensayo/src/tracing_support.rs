//! Logging setup.
//!
//! The engine only emits `tracing` events: a span per test, `debug!` per step,
//! `info!` per result and `warn!` for infrastructure failures. Binaries and
//! demos install a subscriber with [`init_logging`]; `RUST_LOG` overrides the
//! default `info` filter.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::result::{EnsayoError, EnsayoResult};

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global fmt subscriber.
///
/// # Errors
/// Returns [`EnsayoError::Logging`] if a global subscriber is already set.
pub fn init_logging(format: LogFormat) -> EnsayoResult<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false);
    let installed = match format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    installed.map_err(|e| EnsayoError::Logging {
        message: e.to_string(),
    })
}

/// Route events to the test harness's captured output; repeat calls are no-ops
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_an_error() {
        init_test_logging();
        let err = init_logging(LogFormat::Json).unwrap_err();
        assert!(matches!(err, EnsayoError::Logging { .. }));
    }

    #[test]
    fn test_test_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
        tracing::info!("still fine");
    }
}
