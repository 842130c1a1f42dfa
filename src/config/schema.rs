//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::signals::{Signal, SignalSet};

/// Root configuration for the service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Shutdown deadline and watched signals.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ServiceConfig {
    /// Whether moving from `self` to `next` needs a process restart to apply.
    ///
    /// The listener is bound once and the shutdown deadline is fixed at
    /// startup, so changes to either only take effect on restart.
    pub fn requires_restart(&self, next: &ServiceConfig) -> bool {
        self.listener != next.listener || self.shutdown != next.shutdown
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Overall deadline for releasing every resource, in milliseconds.
    pub deadline_ms: u64,

    /// Signals that start shutdown (e.g., ["SIGINT", "SIGTERM"]).
    pub signals: Vec<Signal>,
}

impl ShutdownConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn signal_set(&self) -> SignalSet {
        self.signals.iter().copied().collect()
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 2_000,
            signals: vec![Signal::Interrupt, Signal::Terminate],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line events.
    #[default]
    Compact,
    /// Multi-line, human oriented.
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.shutdown.deadline(), Duration::from_secs(2));
        assert_eq!(config.shutdown.signal_set(), SignalSet::termination());
    }

    #[test]
    fn parses_full_config() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [shutdown]
            deadline_ms = 500
            signals = ["SIGTERM", "hup"]

            [observability]
            log_level = "debug"
            log_format = "pretty"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.shutdown.deadline(), Duration::from_millis(500));
        assert_eq!(config.shutdown.signals, vec![Signal::Terminate, Signal::Hangup]);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn unknown_signal_is_a_parse_error() {
        let result: Result<ServiceConfig, _> = toml::from_str(
            r#"
            [shutdown]
            signals = ["SIGKILL"]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn restart_needed_only_for_fixed_settings() {
        let current = ServiceConfig::default();

        let mut louder = current.clone();
        louder.observability.log_level = "debug".into();
        assert!(!current.requires_restart(&louder));

        let mut longer = current.clone();
        longer.shutdown.deadline_ms = 10_000;
        assert!(current.requires_restart(&longer));
    }
}
