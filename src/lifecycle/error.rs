//! Error types for the lifecycle subsystem.

use thiserror::Error;

use crate::lifecycle::signals::Signal;

/// A resource reported that its release did not succeed.
///
/// Recorded per resource in the shutdown outcome; never escalated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct CloseError {
    reason: String,
}

impl CloseError {
    /// Create a release failure with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The failure reason reported by the resource.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<std::io::Error> for CloseError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Fatal errors raised while setting up shutdown handling.
///
/// These surface before the service starts serving.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The OS refused to register a signal handler.
    #[error("failed to register handler for {signal}: {source}")]
    SignalRegistration {
        signal: Signal,
        #[source]
        source: std::io::Error,
    },

    /// The signal cannot be observed on this platform.
    #[error("{0} is not supported on this platform")]
    UnsupportedSignal(Signal),

    /// No signals were requested, so termination could never be observed.
    #[error("signal set is empty")]
    EmptySignalSet,

    /// Signal handling and the coordinator need a running Tokio runtime.
    #[error("no Tokio runtime available")]
    NoRuntime,
}
