//! Lifecycle shell for long-running network services.
//!
//! Starts serving, watches for termination signals, and releases every
//! registered resource within one deadline, reporting a single outcome.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{ShutdownCoordinator, ShutdownOutcome, ShutdownWaiter};
