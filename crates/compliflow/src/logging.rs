//! Global tracing subscriber setup.

use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::LoggingError;

/// Installs the global subscriber described by `config`.
///
/// `RUST_LOG`, when set and non-empty, replaces the configured filter.
/// Records emitted through the `log` facade by dependencies are forwarded
/// into tracing.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = resolve_filter(std::env::var("RUST_LOG").ok(), &config.filter)?;

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Compact => fmt::layer().with_target(true).compact().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(fmt_layer).with(filter);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))?;

    // Another `log` logger may already own the facade; tracing still works.
    if let Err(e) = tracing_log::LogTracer::init() {
        debug!(error = %e, "log facade bridge not installed");
    }

    debug!(format = ?config.format, "Logging initialized");
    Ok(())
}

/// Picks the effective filter directive: a non-empty environment override
/// wins over the configured one.
pub fn resolve_filter(
    env_override: Option<String>,
    configured: &str,
) -> Result<EnvFilter, LoggingError> {
    let directive = env_override
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| configured.to_string());

    EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidFilter {
        filter: directive.clone(),
        reason: e.to_string(),
    })
}
