//! One-shot shutdown trigger.
//!
//! A [`Trigger`] can be fired any number of times from any number of places
//! (signal handlers, a failing server task, tests). Only the first call has
//! an effect; every [`TriggerEvent`] observes a single transition.

use std::sync::Arc;
use tokio::sync::watch;

/// Firing side of the shutdown trigger.
#[derive(Debug, Clone)]
pub struct Trigger {
    tx: Arc<watch::Sender<bool>>,
}

/// Listening side of the shutdown trigger.
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    rx: watch::Receiver<bool>,
}

impl Trigger {
    /// Create a new, unfired trigger and its event source.
    pub fn new() -> (Self, TriggerEvent) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, TriggerEvent { rx })
    }

    /// Fire the trigger.
    ///
    /// Returns `true` only for the call that flipped the gate.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    /// Whether the trigger has already fired.
    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Create another event source for this trigger.
    pub fn subscribe(&self) -> TriggerEvent {
        TriggerEvent {
            rx: self.tx.subscribe(),
        }
    }
}

impl TriggerEvent {
    /// Wait until the trigger fires.
    ///
    /// Returns `false` if every [`Trigger`] was dropped without firing,
    /// in which case the event can never happen.
    pub async fn fired(&mut self) -> bool {
        self.rx.wait_for(|fired| *fired).await.is_ok()
    }

    /// Whether the trigger has already fired.
    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }
}
