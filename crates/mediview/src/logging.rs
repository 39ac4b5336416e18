//! Process-wide tracing subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingSettings;
use crate::error::ConfigError;

/// `RUST_LOG` wins over the configured level when set.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Installs the global subscriber and bridges `log` records into it.
///
/// Fails if a global subscriber or logger is already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), ConfigError> {
    let fmt_layer = if settings.json {
        fmt::layer().json().with_current_span(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let subscriber = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(build_filter(&settings.level));

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ConfigError::Logging(e.to_string()))?;
    tracing_log::LogTracer::init().map_err(|e| ConfigError::Logging(e.to_string()))?;

    tracing::debug!(level = %settings.level, json = settings.json, "Logging initialized");
    Ok(())
}
