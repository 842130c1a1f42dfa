//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - The lifecycle core only emits debug diagnostics; the owning process
//!   reports the shutdown outcome

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogHandle, LoggingError};
pub use metrics::{init_metrics, record_outcome};
