//! # Dispatchers: how consumer invocations are scheduled.
//!
//! A [`Dispatch`] takes a ready-to-run task (a boxed future driving one
//! consumer invocation) and decides where it executes:
//!
//! - [`SyncDispatcher`] runs it inline on the calling task. This is what
//!   derived (child) buses use, so a pipeline stage's fan-out happens on
//!   the thread that dispatched its input instead of taking a second hop.
//! - [`TaskDispatcher`] spawns one Tokio task per dispatch.
//! - [`QueueDispatcher`] pushes tasks onto a bounded FIFO drained by a
//!   single worker, giving sequential consumer execution with panic
//!   isolation.
//!
//! Dispatchers are shared via `Arc<dyn Dispatch>`; a bus holds exactly one
//! at a time, see [`Reactor::set_dispatcher`](crate::Reactor::set_dispatcher).

use std::sync::Arc;

use futures::future::BoxFuture;

mod queue;
mod sync;
mod task;

pub use queue::QueueDispatcher;
pub use sync::SyncDispatcher;
pub use task::TaskDispatcher;

/// One scheduled consumer invocation.
pub type DispatchTask = BoxFuture<'static, ()>;

/// A scheduling capability.
pub trait Dispatch: Send + Sync {
    /// Schedules `task`. Synchronous implementations run it before
    /// returning; asynchronous ones return immediately.
    fn schedule(&self, task: DispatchTask);
}

/// The dispatcher a fresh bus starts with: task-per-dispatch when an
/// ambient Tokio runtime exists, inline otherwise.
pub(crate) fn default_dispatcher() -> Arc<dyn Dispatch> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Arc::new(TaskDispatcher::from_handle(handle)),
        Err(_) => Arc::new(SyncDispatcher::new()),
    }
}
