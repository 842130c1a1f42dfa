//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shutdown_outcomes_total` (counter): shutdown attempts by overall status
//! - `shutdown_releases_total` (counter): resource releases by result
//! - `shutdown_release_duration_seconds` (histogram): per-resource release time
//! - `shutdown_duration_seconds` (histogram): whole shutdown batch
//!
//! # Design Decisions
//! - Recorded once, from the finished outcome, by the owning process
//! - Prometheus exporter is optional and off by default

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::{ReleaseResult, ShutdownOutcome};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished shutdown.
pub fn record_outcome(outcome: &ShutdownOutcome) {
    metrics::counter!("shutdown_outcomes_total", "status" => outcome.status().as_str()).increment(1);
    metrics::histogram!("shutdown_duration_seconds").record(outcome.elapsed().as_secs_f64());

    for report in outcome.reports() {
        let result = report.result.label();
        metrics::counter!(
            "shutdown_releases_total",
            "resource" => report.id.name().to_string(),
            "result" => result
        )
        .increment(1);

        match &report.result {
            ReleaseResult::Released { elapsed } | ReleaseResult::Failed { elapsed, .. } => {
                metrics::histogram!(
                    "shutdown_release_duration_seconds",
                    "resource" => report.id.name().to_string()
                )
                .record(elapsed.as_secs_f64());
            }
            ReleaseResult::TimedOut => {}
        }
    }
}
