//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for a configured set of termination signals
//! - Translate the first received signal into a single shutdown trigger
//! - Absorb every later signal without re-triggering
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - All registrations happen in `watch`, so a platform that cannot deliver
//!   a signal fails before the service starts serving
//! - Repeated signals are coalesced by Tokio and by the one-shot trigger

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::lifecycle::error::ShutdownError;
use crate::lifecycle::trigger::Trigger;

/// A watchable OS signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Signal {
    /// SIGINT (Ctrl+C).
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGHUP.
    Hangup,
    /// SIGQUIT.
    Quit,
    /// SIGUSR1.
    User1,
    /// SIGUSR2.
    User2,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Hangup => "SIGHUP",
            Signal::Quit => "SIGQUIT",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    fn kind(self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;
        match self {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::Quit => SignalKind::quit(),
            Signal::User1 => SignalKind::user_defined1(),
            Signal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a signal name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal: {0}")]
pub struct UnknownSignal(pub String);

impl FromStr for Signal {
    type Err = UnknownSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("SIG").unwrap_or(&upper);
        match name {
            "INT" | "INTERRUPT" => Ok(Signal::Interrupt),
            "TERM" | "TERMINATE" => Ok(Signal::Terminate),
            "HUP" | "HANGUP" => Ok(Signal::Hangup),
            "QUIT" => Ok(Signal::Quit),
            "USR1" => Ok(Signal::User1),
            "USR2" => Ok(Signal::User2),
            _ => Err(UnknownSignal(s.to_string())),
        }
    }
}

impl TryFrom<String> for Signal {
    type Error = UnknownSignal;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Signal> for String {
    fn from(signal: Signal) -> Self {
        signal.as_str().to_string()
    }
}

/// The set of signals a watcher listens for. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSet {
    signals: BTreeSet<Signal>,
}

impl SignalSet {
    pub fn new(signals: impl IntoIterator<Item = Signal>) -> Self {
        Self {
            signals: signals.into_iter().collect(),
        }
    }

    /// SIGINT and SIGTERM.
    pub fn termination() -> Self {
        Self::new([Signal::Interrupt, Signal::Terminate])
    }

    pub fn contains(&self, signal: Signal) -> bool {
        self.signals.contains(&signal)
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        self.signals.iter().copied()
    }
}

impl Default for SignalSet {
    fn default() -> Self {
        Self::termination()
    }
}

impl FromIterator<Signal> for SignalSet {
    fn from_iter<I: IntoIterator<Item = Signal>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for SignalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, signal) in self.signals.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", signal)?;
        }
        Ok(())
    }
}

/// Background watcher that fires a [`Trigger`] on the first signal.
///
/// Stopping (or dropping) the watcher releases its signal registrations.
#[derive(Debug)]
pub struct SignalWatcher {
    signals: SignalSet,
    task: Option<JoinHandle<()>>,
}

impl SignalWatcher {
    /// Register for `signals` and fire `trigger` on the first delivery.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn watch(signals: &SignalSet, trigger: Trigger) -> Result<Self, ShutdownError> {
        if signals.is_empty() {
            return Err(ShutdownError::EmptySignalSet);
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ShutdownError::NoRuntime);
        }

        let mut deliveries = stream::select_all(register(signals)?);

        let task = tokio::spawn(async move {
            while let Some(signal) = deliveries.next().await {
                if trigger.fire() {
                    tracing::debug!(signal = %signal, "Shutdown triggered by signal");
                } else {
                    tracing::debug!(signal = %signal, "Shutdown already triggered, signal absorbed");
                }
            }
        });

        tracing::debug!(signals = %signals, "Signal watcher started");

        Ok(Self {
            signals: signals.clone(),
            task: Some(task),
        })
    }

    /// The signals being watched.
    pub fn signals(&self) -> &SignalSet {
        &self.signals
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop watching and release the registrations.
    ///
    /// This only stops the process listening. Tokio never restores the
    /// default disposition, so a watched signal delivered after `stop` is
    /// ignored rather than terminating the process.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(signals = %self.signals, "Signal watcher stopped");
        }
    }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(unix)]
fn register(signals: &SignalSet) -> Result<Vec<BoxStream<'static, Signal>>, ShutdownError> {
    signals
        .iter()
        .map(|signal| {
            let listener = tokio::signal::unix::signal(signal.kind())
                .map_err(|source| ShutdownError::SignalRegistration { signal, source })?;
            Ok(stream::unfold(listener, move |mut listener| async move {
                listener.recv().await.map(|()| (signal, listener))
            })
            .boxed())
        })
        .collect()
}

#[cfg(not(unix))]
fn register(signals: &SignalSet) -> Result<Vec<BoxStream<'static, Signal>>, ShutdownError> {
    if let Some(signal) = signals.iter().find(|s| *s != Signal::Interrupt) {
        return Err(ShutdownError::UnsupportedSignal(signal));
    }
    Ok(vec![stream::unfold((), |()| async {
        tokio::signal::ctrl_c()
            .await
            .ok()
            .map(|()| (Signal::Interrupt, ()))
    })
    .boxed()])
}
