//! service-shell
//!
//! Runs the HTTP service until a termination signal arrives (or the server
//! fails on its own), then releases every resource within the configured
//! deadline and exits with a code reflecting how shutdown went.
//!
//! ```text
//!   config ──▶ logging/metrics ──▶ bind ──▶ HttpServer::spawn
//!                                               │
//!   SIGINT/SIGTERM ──▶ SignalWatcher ──▶ Trigger │
//!                                         │     │ server exits on error
//!                                         ▼     ▼
//!                               ShutdownCoordinator::run_once
//!                               ├─ http-server (drain)
//!                               └─ config-watcher
//!                                         │
//!                               run_until_shutdown ──▶ exit code
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use service_shell::config::validation::validate_config;
use service_shell::config::{load_config, ConfigError, ConfigWatcher, ServiceConfig};
use service_shell::http::HttpServer;
use service_shell::lifecycle::{
    run_until_shutdown, Closeable, OutcomeStatus, ReleaseResult, ShutdownCoordinator,
    ShutdownOutcome, SignalWatcher, Trigger,
};
use service_shell::observability::{self, LogHandle};

#[derive(Parser)]
#[command(name = "service-shell")]
#[command(about = "HTTP service with coordinated graceful shutdown", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file (watched for changes).
    #[arg(short, long, env = "SERVICE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configured bind address port.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Shutdown deadline in milliseconds, overriding the configuration.
    #[arg(long)]
    deadline_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.bind_address = with_port(&config.listener.bind_address, port);
    }
    if let Some(deadline_ms) = cli.deadline_ms {
        config.shutdown.deadline_ms = deadline_ms;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    let log_handle = observability::init_logging(&config.observability)?;

    tracing::info!("service-shell v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        deadline_ms = config.shutdown.deadline_ms,
        signals = %config.shutdown.signal_set(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        observability::init_metrics(addr)?;
    }

    // Fail before serving if signals cannot be observed.
    let (trigger, events) = Trigger::new();
    let _signals = SignalWatcher::watch(&config.shutdown.signal_set(), trigger)?;

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new().spawn(listener)?;

    tracing::info!(
        address = %server.local_addr(),
        "Listening for connections"
    );

    let mut resources: Vec<Arc<dyn Closeable>> = Vec::new();
    resources.push(server.stopper());
    if let Some(path) = &cli.config {
        let (watcher, updates) = ConfigWatcher::start(path)?;
        resources.push(watcher);
        tokio::spawn(apply_config_updates(config.clone(), updates, log_handle));
    }

    let coordinator = ShutdownCoordinator::new(resources, config.shutdown.deadline(), events)?;

    let outcome = run_until_shutdown(&coordinator, server.join()).await;
    report(&outcome);

    Ok(exit_code(outcome.status()))
}

/// Replace the port of `bind_address`, leaving unparseable values to validation.
fn with_port(bind_address: &str, port: u16) -> String {
    match bind_address.parse::<SocketAddr>() {
        Ok(mut addr) => {
            addr.set_port(port);
            addr.to_string()
        }
        Err(_) => bind_address.to_string(),
    }
}

/// Apply reloaded configuration where it can take effect live.
async fn apply_config_updates(
    mut current: ServiceConfig,
    mut updates: mpsc::UnboundedReceiver<ServiceConfig>,
    log_handle: LogHandle,
) {
    while let Some(next) = updates.recv().await {
        if current.requires_restart(&next) {
            tracing::warn!("Listener or shutdown settings changed; restart to apply them");
        }
        if next.observability.log_level != current.observability.log_level {
            match log_handle.set_level(&next.observability.log_level) {
                Ok(()) => tracing::info!(log_level = %next.observability.log_level, "Log level updated"),
                Err(e) => tracing::error!(error = %e, "Failed to update log level"),
            }
        }
        current = next;
    }
}

fn report(outcome: &ShutdownOutcome) {
    observability::record_outcome(outcome);

    for entry in outcome.reports() {
        match &entry.result {
            ReleaseResult::Released { elapsed } => {
                tracing::info!(resource = %entry.id, elapsed = ?elapsed, "Resource released");
            }
            ReleaseResult::Failed { reason, elapsed } => {
                tracing::warn!(resource = %entry.id, elapsed = ?elapsed, reason = %reason, "Resource release failed");
            }
            ReleaseResult::TimedOut => {
                tracing::warn!(
                    resource = %entry.id,
                    deadline = ?outcome.deadline(),
                    "Resource release still running at deadline"
                );
            }
        }
    }

    match outcome.status() {
        OutcomeStatus::Clean => tracing::info!(elapsed = ?outcome.elapsed(), "Shutdown complete"),
        _ => tracing::warn!("Shutdown error: {}", outcome),
    }
}

fn exit_code(status: OutcomeStatus) -> ExitCode {
    match status {
        OutcomeStatus::Clean => ExitCode::SUCCESS,
        OutcomeStatus::PartialFailure => ExitCode::from(1),
        OutcomeStatus::TimedOut => ExitCode::from(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_override_keeps_host() {
        assert_eq!(with_port("127.0.0.1:8080", 9000), "127.0.0.1:9000");
        assert_eq!(with_port("bogus", 9000), "bogus");
    }

    #[test]
    fn cli_parses_overrides() {
        let cli = Cli::parse_from(["service-shell", "--port", "9000", "--deadline-ms", "500"]);
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.deadline_ms, Some(500));
    }
}
