//! Logging setup for binaries embedding the crate.
//!
//! Library code logs through `log` and `tracing` macros only; installing a
//! subscriber is left to the host process via [`init_logging`].

use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

const DEFAULT_FILTER: &str = "juai=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("A global logger is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Calling it twice returns an error instead of panicking.
pub fn init_logging(format: LogFormat) -> Result<(), TelemetryError> {
    tracing_log::LogTracer::init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    // LogTracer is already bridging `log`, so install the registry directly.
    let result = match format {
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(registry.with(tracing_subscriber::fmt::layer()))
        }
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().json()),
        ),
    };

    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}
