//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config, overridable via `RUST_LOG`
//! - Change the log level at runtime on config reload
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Compact format for production, pretty format for development
//! - The filter sits behind a reload layer; the format is fixed at startup

use thiserror::Error;
use tracing_subscriber::{
    filter::ParseError,
    layer::SubscriberExt,
    reload,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Registry,
};

use crate::config::{LogFormat, ObservabilityConfig};

/// Errors from installing or adjusting the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] TryInitError),
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("failed to reload log filter: {0}")]
    Reload(#[from] reload::Error),
}

/// Handle for changing the active log filter.
#[derive(Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Replace the active filter with `level` (any `EnvFilter` directive).
    pub fn set_level(&self, level: &str) -> Result<(), LoggingError> {
        let filter = EnvFilter::try_new(level)?;
        self.filter.reload(filter)?;
        Ok(())
    }
}

/// Build the filter: `RUST_LOG` wins, then the configured level.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| "info".into())
}

/// Install the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<LogHandle, LoggingError> {
    let (filter, handle) = reload::Layer::new(env_filter(config));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?,
    }

    Ok(LogHandle { filter: handle })
}
