//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger::fire (first one wins, rest absorbed)
//!
//! Shutdown (shutdown.rs):
//!     Trigger fired or run_once() → release all resources concurrently
//!     → deadline elapses or all done → ShutdownOutcome
//!
//! Waiter (waiter.rs):
//!     wait() → same Arc<ShutdownOutcome> for every caller
//!
//! Run (run.rs):
//!     serving task fails → run_once(); outcome published → return,
//!     even while the serving task is still draining
//! ```
//!
//! # Design Decisions
//! - Signal handling is injected through a `Trigger`, so the coordinator can
//!   be driven synchronously in tests
//! - One deadline for the whole batch, never extended
//! - Releases still running at the deadline are reported, not aborted
//! - The outcome is write-once and read without locks

pub mod error;
pub mod outcome;
pub mod resource;
pub mod run;
pub mod shutdown;
pub mod signals;
pub mod trigger;
pub mod waiter;

pub use error::{CloseError, ShutdownError};
pub use outcome::{OutcomeStatus, ReleaseResult, ResourceReport, ShutdownOutcome};
pub use resource::{Closeable, ResourceId};
pub use run::run_until_shutdown;
pub use shutdown::{CoordinatorState, ShutdownCoordinator, ShutdownCoordinatorBuilder, DEFAULT_DEADLINE};
pub use signals::{Signal, SignalSet, SignalWatcher};
pub use trigger::{Trigger, TriggerEvent};
pub use waiter::ShutdownWaiter;
