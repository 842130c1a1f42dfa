//! Shared resources and helpers for integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use service_shell::lifecycle::resource;
use service_shell::lifecycle::{CloseError, Closeable};

/// A resource that counts its releases and succeeds after `delay`.
#[allow(dead_code)]
pub fn counting(name: &str, calls: &Arc<AtomicU32>, delay: Duration) -> Arc<dyn Closeable> {
    let calls = calls.clone();
    resource::from_fn(name, move || {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            Ok(())
        }
    })
}

/// A resource whose release reports `reason`.
#[allow(dead_code)]
pub fn failing(name: &str, reason: &'static str) -> Arc<dyn Closeable> {
    resource::from_fn(name, move || async move { Err(CloseError::new(reason)) })
}

/// A resource whose release never returns.
#[allow(dead_code)]
pub fn hanging(name: &str) -> Arc<dyn Closeable> {
    resource::from_fn(name, || std::future::pending::<Result<(), CloseError>>())
}

/// Total calls recorded by a counter.
#[allow(dead_code)]
pub fn calls(counter: &Arc<AtomicU32>) -> u32 {
    counter.load(Ordering::SeqCst)
}
