//! Shutdown coordination for the service.
//!
//! # Responsibilities
//! - Hold the ordered list of resources to release
//! - Start every release concurrently when shutdown begins
//! - Enforce one deadline across the whole batch
//! - Publish a single aggregated outcome
//!
//! # Design Decisions
//! - Teardown runs on its own task, so dropping a `run_once` future can
//!   neither abort nor restart it
//! - Each release runs on its own task: a panic is captured as a failure,
//!   and a release still running at the deadline is detached, not aborted

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::lifecycle::error::{CloseError, ShutdownError};
use crate::lifecycle::outcome::{OutcomeStatus, ReleaseResult, ResourceReport, ShutdownOutcome};
use crate::lifecycle::resource::{Closeable, ResourceId};
use crate::lifecycle::trigger::TriggerEvent;
use crate::lifecycle::waiter::{OutcomeCell, ShutdownWaiter};

/// Deadline used when none is configured.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(2);

/// Coordinator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Waiting for a trigger or an explicit run.
    Idle,
    /// Releases are in flight.
    ShuttingDown,
    Clean,
    PartialFailure,
    TimedOut,
}

impl CoordinatorState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CoordinatorState::Idle | CoordinatorState::ShuttingDown)
    }
}

impl From<OutcomeStatus> for CoordinatorState {
    fn from(status: OutcomeStatus) -> Self {
        match status {
            OutcomeStatus::Clean => CoordinatorState::Clean,
            OutcomeStatus::PartialFailure => CoordinatorState::PartialFailure,
            OutcomeStatus::TimedOut => CoordinatorState::TimedOut,
        }
    }
}

struct Registered {
    id: ResourceId,
    resource: Arc<dyn Closeable>,
}

struct Shared {
    resources: Vec<Registered>,
    deadline: Duration,
    started: AtomicBool,
    outcome: Arc<OutcomeCell>,
}

impl Shared {
    /// Claim the single shutdown run. Returns `false` if already claimed.
    fn start(self: &Arc<Self>) -> bool {
        if self.started.swap(true, Ordering::AcqRel) {
            return false;
        }

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = shared.release_all().await;
            shared.outcome.publish(outcome);
        });
        true
    }

    async fn release_all(&self) -> ShutdownOutcome {
        let started = Instant::now();
        let expiry = tokio::time::sleep_until(started + self.deadline);
        tokio::pin!(expiry);

        tracing::debug!(
            resources = self.resources.len(),
            deadline = ?self.deadline,
            "Releasing resources"
        );

        let mut in_flight: FuturesUnordered<_> = self
            .resources
            .iter()
            .map(|registered| {
                let index = registered.id.index();
                let handle = spawn_release(Arc::clone(&registered.resource));
                async move { (index, handle.await) }
            })
            .collect();

        let mut results: Vec<Option<ReleaseResult>> = vec![None; self.resources.len()];

        loop {
            tokio::select! {
                biased;
                next = in_flight.next() => match next {
                    Some((index, joined)) => {
                        let result = match joined {
                            Ok((Ok(()), elapsed)) => ReleaseResult::Released { elapsed },
                            Ok((Err(e), elapsed)) => ReleaseResult::Failed {
                                reason: e.reason().to_string(),
                                elapsed,
                            },
                            Err(e) => ReleaseResult::Failed {
                                reason: if e.is_panic() {
                                    "release panicked".to_string()
                                } else {
                                    "release cancelled".to_string()
                                },
                                elapsed: started.elapsed(),
                            },
                        };
                        tracing::trace!(
                            resource = %self.resources[index].id,
                            result = result.label(),
                            "Resource release finished"
                        );
                        results[index] = Some(result);
                    }
                    None => break,
                },
                _ = &mut expiry => {
                    tracing::debug!(
                        outstanding = in_flight.len(),
                        "Shutdown deadline elapsed, leaving releases in background"
                    );
                    break;
                }
            }
        }

        // Dropping the join handles detaches whatever is still running.
        drop(in_flight);

        let reports = self
            .resources
            .iter()
            .zip(results)
            .map(|(registered, result)| ResourceReport {
                id: registered.id.clone(),
                result: result.unwrap_or(ReleaseResult::TimedOut),
            })
            .collect();

        ShutdownOutcome::new(reports, self.deadline, started.elapsed())
    }
}

fn spawn_release(resource: Arc<dyn Closeable>) -> JoinHandle<(Result<(), CloseError>, Duration)> {
    tokio::spawn(async move {
        let begun = Instant::now();
        let result = resource.close().await;
        (result, begun.elapsed())
    })
}

/// Releases a fixed set of resources exactly once, within a deadline.
///
/// Shutdown begins either when the [`TriggerEvent`] fires or when
/// [`ShutdownCoordinator::run_once`] is called, whichever comes first.
/// Both paths converge on the same single run and the same outcome.
pub struct ShutdownCoordinator {
    shared: Arc<Shared>,
}

impl ShutdownCoordinator {
    /// Start building a coordinator.
    pub fn builder() -> ShutdownCoordinatorBuilder {
        ShutdownCoordinatorBuilder::default()
    }

    /// Create a coordinator for `resources` that starts when `events` fires.
    ///
    /// Fails with [`ShutdownError::NoRuntime`] outside a Tokio runtime.
    pub fn new(
        resources: Vec<Arc<dyn Closeable>>,
        deadline: Duration,
        mut events: TriggerEvent,
    ) -> Result<Self, ShutdownError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ShutdownError::NoRuntime);
        }

        let resources = resources
            .into_iter()
            .enumerate()
            .map(|(index, resource)| Registered {
                id: ResourceId::new(index, resource.name()),
                resource,
            })
            .collect();

        let shared = Arc::new(Shared {
            resources,
            deadline,
            started: AtomicBool::new(false),
            outcome: Arc::new(OutcomeCell::default()),
        });

        let on_trigger = Arc::clone(&shared);
        tokio::spawn(async move {
            if events.fired().await && on_trigger.start() {
                tracing::debug!("Shutdown started by trigger");
            }
        });

        Ok(Self { shared })
    }

    /// Run shutdown now, or join the run already in progress.
    ///
    /// Every call returns the same outcome; no resource is released twice.
    pub async fn run_once(&self) -> Arc<ShutdownOutcome> {
        if self.shared.start() {
            tracing::debug!("Shutdown started by explicit request");
        }
        self.waiter().wait().await
    }

    /// A handle for waiting on the outcome.
    pub fn waiter(&self) -> ShutdownWaiter {
        ShutdownWaiter::new(Arc::clone(&self.shared.outcome))
    }

    pub fn state(&self) -> CoordinatorState {
        match self.shared.outcome.get() {
            Some(outcome) => outcome.status().into(),
            None if self.shared.started.load(Ordering::Acquire) => CoordinatorState::ShuttingDown,
            None => CoordinatorState::Idle,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.shared.deadline
    }

    /// Registered resources, in registration order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceId> {
        self.shared.resources.iter().map(|r| &r.id)
    }
}

/// Builder for [`ShutdownCoordinator`].
pub struct ShutdownCoordinatorBuilder {
    resources: Vec<Arc<dyn Closeable>>,
    deadline: Duration,
}

impl Default for ShutdownCoordinatorBuilder {
    fn default() -> Self {
        Self {
            resources: Vec::new(),
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl ShutdownCoordinatorBuilder {
    /// Overall time budget for releasing every resource.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Register a resource. Registration order is the report order.
    pub fn resource(mut self, resource: Arc<dyn Closeable>) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn resources(mut self, resources: impl IntoIterator<Item = Arc<dyn Closeable>>) -> Self {
        self.resources.extend(resources);
        self
    }

    /// Build the coordinator, listening on `events` for the trigger.
    pub fn build(self, events: TriggerEvent) -> Result<ShutdownCoordinator, ShutdownError> {
        ShutdownCoordinator::new(self.resources, self.deadline, events)
    }
}
