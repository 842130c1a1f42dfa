//! Blocking rendezvous for the shutdown outcome.

use std::sync::{Arc, OnceLock};

use tokio::sync::Notify;

use crate::lifecycle::outcome::ShutdownOutcome;

/// Write-once slot for the outcome, readable without locking.
#[derive(Debug, Default)]
pub(crate) struct OutcomeCell {
    value: OnceLock<Arc<ShutdownOutcome>>,
    notify: Notify,
}

impl OutcomeCell {
    /// Store the outcome and wake every waiter.
    ///
    /// Only the first publish is kept; the stored value is returned.
    pub(crate) fn publish(&self, outcome: ShutdownOutcome) -> Arc<ShutdownOutcome> {
        let stored = Arc::clone(self.value.get_or_init(|| Arc::new(outcome)));
        self.notify.notify_waiters();
        stored
    }

    pub(crate) fn get(&self) -> Option<&Arc<ShutdownOutcome>> {
        self.value.get()
    }

    async fn wait(&self) -> Arc<ShutdownOutcome> {
        loop {
            // Register before checking so a publish in between is not missed.
            let notified = self.notify.notified();
            if let Some(outcome) = self.value.get() {
                return Arc::clone(outcome);
            }
            notified.await;
        }
    }
}

/// Handle for awaiting the shutdown outcome.
///
/// Cheap to clone; every clone observes the same outcome.
#[derive(Debug, Clone)]
pub struct ShutdownWaiter {
    cell: Arc<OutcomeCell>,
}

impl ShutdownWaiter {
    pub(crate) fn new(cell: Arc<OutcomeCell>) -> Self {
        Self { cell }
    }

    /// Wait until shutdown has produced its outcome.
    ///
    /// Safe to call before shutdown is triggered; it simply waits.
    pub async fn wait(&self) -> Arc<ShutdownOutcome> {
        self.cell.wait().await
    }

    /// The outcome, if shutdown has already finished.
    pub fn try_outcome(&self) -> Option<Arc<ShutdownOutcome>> {
        self.cell.get().cloned()
    }
}
