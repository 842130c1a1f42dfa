//! Closeable resources.
//!
//! # Responsibilities
//! - Define the release contract the coordinator drives
//! - Adapt plain closures (async or blocking) into resources
//!
//! # Design Decisions
//! - `close` takes `Arc<Self>` and returns a `'static` future so a release
//!   can keep running after the deadline without borrowing the coordinator
//! - Blocking teardown runs on Tokio's blocking pool, never on a worker

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::lifecycle::error::CloseError;

/// Anything that can be released during shutdown.
///
/// Owners keep their own `Arc`; the coordinator only holds a clone long
/// enough to call [`Closeable::close`] once.
pub trait Closeable: Send + Sync + 'static {
    /// Human readable name used in the outcome and logs.
    fn name(&self) -> &str;

    /// Release the resource.
    fn close(self: Arc<Self>) -> BoxFuture<'static, Result<(), CloseError>>;
}

/// Identity of a registered resource: its registration slot and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    index: usize,
    name: Arc<str>,
}

impl ResourceId {
    pub(crate) fn new(index: usize, name: &str) -> Self {
        Self {
            index,
            name: Arc::from(name),
        }
    }

    /// Position in registration order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.index, self.name)
    }
}

/// A resource backed by an async closure.
pub struct FnCloser<F> {
    name: String,
    f: F,
}

/// Wrap an async closure as a [`Closeable`].
pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<FnCloser<F>>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CloseError>> + Send + 'static,
{
    Arc::new(FnCloser {
        name: name.into(),
        f,
    })
}

impl<F, Fut> Closeable for FnCloser<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CloseError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn close(self: Arc<Self>) -> BoxFuture<'static, Result<(), CloseError>> {
        Box::pin((self.f)())
    }
}

/// A resource whose teardown is a synchronous call.
pub struct BlockingCloser<F> {
    name: String,
    f: F,
}

/// Wrap a synchronous teardown as a [`Closeable`].
///
/// The closure runs on the blocking thread pool.
pub fn blocking<F>(name: impl Into<String>, f: F) -> Arc<BlockingCloser<F>>
where
    F: Fn() -> Result<(), CloseError> + Send + Sync + 'static,
{
    Arc::new(BlockingCloser {
        name: name.into(),
        f,
    })
}

impl<F> Closeable for BlockingCloser<F>
where
    F: Fn() -> Result<(), CloseError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn close(self: Arc<Self>) -> BoxFuture<'static, Result<(), CloseError>> {
        Box::pin(async move {
            match tokio::task::spawn_blocking(move || (self.f)()).await {
                Ok(result) => result,
                Err(e) => Err(CloseError::new(format!("blocking release aborted: {}", e))),
            }
        })
    }
}
