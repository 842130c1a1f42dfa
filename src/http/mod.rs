//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing layer)
//!     → /healthz or application routes
//!     → Send to client
//!
//! On shutdown:
//!     ServerStop::close → stop accepting → drain in-flight → task exits
//! ```

pub mod server;

pub use server::{HttpServer, RunningServer, ServerStop, HEALTH_PATH};
