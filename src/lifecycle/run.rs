//! Serving until shutdown completes.
//!
//! # Design Decisions
//! - The outcome wins over the serving task: a drain still running at the
//!   deadline does not hold the caller past it
//! - A serving task that fails on its own starts shutdown immediately

use std::future::Future;
use std::io;
use std::sync::Arc;

use crate::lifecycle::outcome::ShutdownOutcome;
use crate::lifecycle::shutdown::ShutdownCoordinator;

/// Wait for shutdown while `serving` runs.
///
/// Returns as soon as the coordinator publishes its outcome. If `serving`
/// fails first, shutdown is run now and its outcome returned. A clean exit
/// of `serving` (after its stop was requested) keeps waiting for the
/// outcome.
pub async fn run_until_shutdown<F>(coordinator: &ShutdownCoordinator, serving: F) -> Arc<ShutdownOutcome>
where
    F: Future<Output = Result<(), io::Error>>,
{
    let waiter = coordinator.waiter();
    tokio::pin!(serving);

    tokio::select! {
        biased;
        outcome = waiter.wait() => outcome,
        exited = &mut serving => match exited {
            Ok(()) => waiter.wait().await,
            Err(e) => {
                tracing::error!(error = %e, "Server exited unexpectedly");
                coordinator.run_once().await
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::outcome::OutcomeStatus;
    use crate::lifecycle::trigger::Trigger;
    use std::time::Duration;

    #[tokio::test]
    async fn serving_failure_runs_shutdown() {
        let (_trigger, events) = Trigger::new();
        let coordinator = ShutdownCoordinator::builder().build(events).unwrap();

        let outcome = run_until_shutdown(&coordinator, async { Err::<(), _>(io::Error::other("accept failed")) }).await;
        assert_eq!(outcome.status(), OutcomeStatus::Clean);
        assert!(coordinator.state().is_terminal());
    }

    #[tokio::test]
    async fn outcome_does_not_wait_for_serving() {
        let (trigger, events) = Trigger::new();
        let coordinator = ShutdownCoordinator::builder().build(events).unwrap();
        trigger.fire();

        let outcome = tokio::time::timeout(
            Duration::from_millis(500),
            run_until_shutdown(&coordinator, std::future::pending::<io::Result<()>>()),
        )
        .await
        .expect("outcome published while serving never exits");
        assert!(outcome.is_clean());
    }
}
