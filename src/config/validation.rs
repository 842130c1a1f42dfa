//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (deadline > 0, addresses parse)
//! - Reject configs that could never observe a shutdown signal
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::schema::ServiceConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The listener address does not parse as `host:port`.
    InvalidBindAddress(String),
    /// The metrics address does not parse as `host:port`.
    InvalidMetricsAddress(String),
    /// A zero deadline would time out every resource.
    ZeroDeadline,
    /// No shutdown signals configured.
    NoSignals,
    /// The log filter directive does not parse.
    InvalidLogLevel(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidBindAddress(a) => write!(f, "invalid listener.bind_address '{}'", a),
            ValidationError::InvalidMetricsAddress(a) => {
                write!(f, "invalid observability.metrics_address '{}'", a)
            }
            ValidationError::ZeroDeadline => write!(f, "shutdown.deadline_ms must be greater than 0"),
            ValidationError::NoSignals => write!(f, "shutdown.signals must not be empty"),
            ValidationError::InvalidLogLevel(l) => write!(f, "invalid observability.log_level '{}'", l),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.shutdown.deadline_ms == 0 {
        errors.push(ValidationError::ZeroDeadline);
    }

    if config.shutdown.signals.is_empty() {
        errors.push(ValidationError::NoSignals);
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if EnvFilter::try_new(&observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
