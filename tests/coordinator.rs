//! Shutdown coordinator behaviour under success, failure and timeout.

use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use service_shell::lifecycle::{
    CoordinatorState, OutcomeStatus, ReleaseResult, ShutdownCoordinator, Trigger,
};

mod common;

#[tokio::test]
async fn test_all_resources_released_cleanly() {
    let calls = Arc::new(AtomicU32::new(0));
    let (_trigger, events) = Trigger::new();
    let coordinator = ShutdownCoordinator::builder()
        .deadline(Duration::from_secs(1))
        .resource(common::counting("a", &calls, Duration::from_millis(10)))
        .resource(common::counting("b", &calls, Duration::from_millis(10)))
        .resource(common::counting("c", &calls, Duration::from_millis(10)))
        .build(events).unwrap();

    let outcome = coordinator.run_once().await;

    assert_eq!(outcome.status(), OutcomeStatus::Clean);
    assert_eq!(outcome.reports().len(), 3);
    assert!(outcome.reports().iter().all(|r| r.result.is_released()));
    assert_eq!(common::calls(&calls), 3);
    assert_eq!(coordinator.state(), CoordinatorState::Clean);
}

#[tokio::test]
async fn test_releases_run_concurrently() {
    let calls = Arc::new(AtomicU32::new(0));
    let (_trigger, events) = Trigger::new();
    let coordinator = ShutdownCoordinator::builder()
        .deadline(Duration::from_secs(2))
        .resources((0..5).map(|i| common::counting(&format!("r{}", i), &calls, Duration::from_millis(200))))
        .build(events).unwrap();

    let start = Instant::now();
    let outcome = coordinator.run_once().await;

    assert!(outcome.is_clean());
    // Sequential release would take a full second.
    assert!(start.elapsed() < Duration::from_millis(800), "took {:?}", start.elapsed());
}

#[tokio::test]
async fn test_mixed_results_are_partial_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let (_trigger, events) = Trigger::new();
    let coordinator = ShutdownCoordinator::builder()
        .deadline(Duration::from_secs(1))
        .resource(common::counting("a", &calls, Duration::from_millis(5)))
        .resource(common::failing("b", "backend refused to close"))
        .build(events).unwrap();

    let outcome = coordinator.run_once().await;

    assert_eq!(outcome.status(), OutcomeStatus::PartialFailure);
    assert!(outcome.get("a").unwrap().is_released());
    match outcome.get("b") {
        Some(ReleaseResult::Failed { reason, .. }) => assert_eq!(reason, "backend refused to close"),
        other => panic!("expected failure for b, got {:?}", other),
    }
    assert_eq!(coordinator.state(), CoordinatorState::PartialFailure);
}

#[tokio::test]
async fn test_deadline_bounds_hanging_release() {
    let calls = Arc::new(AtomicU32::new(0));
    let (_trigger, events) = Trigger::new();
    let deadline = Duration::from_millis(200);
    let coordinator = ShutdownCoordinator::builder()
        .deadline(deadline)
        .resource(common::counting("quick", &calls, Duration::from_millis(5)))
        .resource(common::hanging("stuck"))
        .resource(common::failing("broken", "nope"))
        .build(events).unwrap();

    let start = Instant::now();
    let outcome = coordinator.run_once().await;
    let elapsed = start.elapsed();

    assert!(elapsed >= deadline);
    assert!(elapsed < deadline + Duration::from_millis(300), "took {:?}", elapsed);
    assert_eq!(outcome.status(), OutcomeStatus::TimedOut);
    assert_eq!(outcome.get("stuck"), Some(&ReleaseResult::TimedOut));
    assert!(outcome.get("quick").unwrap().is_released());
    assert!(matches!(outcome.get("broken"), Some(ReleaseResult::Failed { .. })));
    assert_eq!(coordinator.state(), CoordinatorState::TimedOut);
}

#[tokio::test]
async fn test_run_once_is_idempotent() {
    let calls = Arc::new(AtomicU32::new(0));
    let (_trigger, events) = Trigger::new();
    let coordinator = ShutdownCoordinator::builder()
        .resource(common::counting("db", &calls, Duration::from_millis(10)))
        .resource(common::counting("cache", &calls, Duration::from_millis(10)))
        .build(events).unwrap();

    let first = coordinator.run_once().await;
    let second = coordinator.run_once().await;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(common::calls(&calls), 2);
}

#[tokio::test]
async fn test_concurrent_run_once_calls_share_one_run() {
    let calls = Arc::new(AtomicU32::new(0));
    let (_trigger, events) = Trigger::new();
    let coordinator = Arc::new(
        ShutdownCoordinator::builder()
            .resource(common::counting("db", &calls, Duration::from_millis(50)))
            .build(events).unwrap(),
    );

    let runs: Vec<_> = (0..10)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.run_once().await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for run in runs {
        outcomes.push(run.await.unwrap());
    }

    assert!(outcomes.iter().all(|o| Arc::ptr_eq(o, &outcomes[0])));
    assert_eq!(common::calls(&calls), 1);
}

#[tokio::test]
async fn test_repeated_triggers_run_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let (trigger, events) = Trigger::new();
    let coordinator = ShutdownCoordinator::builder()
        .resource(common::counting("db", &calls, Duration::from_millis(10)))
        .build(events).unwrap();
    let waiter = coordinator.waiter();

    for _ in 0..20 {
        trigger.fire();
    }
    let outcome = waiter.wait().await;

    // An explicit run after the trigger joins the same run.
    let explicit = coordinator.run_once().await;
    assert!(Arc::ptr_eq(&outcome, &explicit));
    assert_eq!(common::calls(&calls), 1);
}

#[tokio::test]
async fn test_concurrent_waiters_before_trigger() {
    let calls = Arc::new(AtomicU32::new(0));
    let (trigger, events) = Trigger::new();
    let coordinator = ShutdownCoordinator::builder()
        .resource(common::counting("db", &calls, Duration::from_millis(10)))
        .build(events).unwrap();

    let waiters: Vec<_> = (0..16)
        .map(|_| {
            let waiter = coordinator.waiter();
            tokio::spawn(async move { waiter.wait().await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(coordinator.state(), CoordinatorState::Idle);
    assert!(coordinator.waiter().try_outcome().is_none());

    trigger.fire();

    let mut outcomes = Vec::new();
    for waiter in waiters {
        outcomes.push(waiter.await.unwrap());
    }
    assert!(outcomes.iter().all(|o| Arc::ptr_eq(o, &outcomes[0])));
    assert!(outcomes[0].is_clean());
}

#[tokio::test]
async fn test_no_resources_is_clean_immediately() {
    let (trigger, events) = Trigger::new();
    let coordinator = ShutdownCoordinator::builder()
        .deadline(Duration::from_secs(5))
        .build(events).unwrap();
    let waiter = coordinator.waiter();

    let start = Instant::now();
    trigger.fire();
    let outcome = waiter.wait().await;

    assert_eq!(outcome.status(), OutcomeStatus::Clean);
    assert!(outcome.reports().is_empty());
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[tokio::test]
async fn test_timed_out_release_keeps_running_in_background() {
    let finished = Arc::new(AtomicU32::new(0));
    let f = finished.clone();
    let (_trigger, events) = Trigger::new();
    let coordinator = ShutdownCoordinator::builder()
        .deadline(Duration::from_millis(50))
        .resource(service_shell::lifecycle::resource::from_fn("slow", move || {
            let f = f.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                f.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            }
        }))
        .build(events).unwrap();

    let outcome = coordinator.run_once().await;
    assert_eq!(outcome.status(), OutcomeStatus::TimedOut);
    assert_eq!(common::calls(&finished), 0);

    // The release was not aborted; it finishes on its own.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(common::calls(&finished), 1);

    // The recorded outcome does not change afterwards.
    assert_eq!(coordinator.run_once().await.status(), OutcomeStatus::TimedOut);
}
