//! # Bounded FIFO dispatcher.
//!
//! [`QueueDispatcher`] queues tasks onto a bounded channel drained by a
//! single worker task:
//!
//! ```text
//! schedule(task) ──► [bounded queue] ──► worker ──► task.await
//!                         │                 └────► panic → logged, worker continues
//!                         └── full → task dropped, logged
//! ```
//!
//! ## Rules
//! - **Sequential execution**: tasks run one at a time, in schedule order
//! - **Non-blocking**: `schedule` never waits; on a full queue the task is
//!   dropped and a warning is logged
//! - **Panic isolation**: a panicking consumer is caught and logged; the
//!   worker keeps draining
//! - **Shutdown**: [`QueueDispatcher::shutdown`] stops the worker after it
//!   drains whatever is already queued

use std::panic::AssertUnwindSafe;
use std::sync::Mutex;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{Dispatch, DispatchTask};

/// Single-worker FIFO dispatcher over a bounded queue.
pub struct QueueDispatcher {
    tx: mpsc::Sender<DispatchTask>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueueDispatcher {
    /// Creates the dispatcher and spawns its worker task.
    ///
    /// `capacity` bounds the queue and is clamped to at least 1.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime; the worker needs one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<DispatchTask>(capacity.max(1));
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let worker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    task = rx.recv() => match task {
                        Some(task) => run(task).await,
                        None => break,
                    },
                    _ = token.cancelled() => {
                        while let Ok(task) = rx.try_recv() {
                            run(task).await;
                        }
                        break;
                    }
                }
            }
        });

        Self {
            tx,
            cancel,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Stops the worker after draining already-queued tasks.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Dispatch for QueueDispatcher {
    fn schedule(&self, task: DispatchTask) {
        if self.cancel.is_cancelled() {
            log::warn!("queue dispatcher is shut down; dropping task");
            return;
        }
        match self.tx.try_send(task) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("queue dispatcher full; dropping task");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::warn!("queue dispatcher closed; dropping task");
            }
        }
    }
}

async fn run(task: DispatchTask) {
    if let Err(panic_err) = AssertUnwindSafe(task).catch_unwind().await {
        let info = {
            let any = &*panic_err;
            if let Some(msg) = any.downcast_ref::<&'static str>() {
                (*msg).to_string()
            } else if let Some(msg) = any.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic".to_string()
            }
        };
        log::error!("consumer panicked in queue dispatcher: {info}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn drains_in_fifo_order() {
        let dispatcher = QueueDispatcher::new(16);
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let seen = seen.clone();
            dispatcher.schedule(Box::pin(async move {
                seen.lock().unwrap().push(i);
            }));
        }
        dispatcher.shutdown().await;
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn overflow_drops_instead_of_blocking() {
        let dispatcher = QueueDispatcher::new(1);
        let ran = Arc::new(AtomicUsize::new(0));
        // The worker cannot make progress while this test task holds the
        // only thread, so everything past the first task overflows.
        for _ in 0..3 {
            let ran = ran.clone();
            dispatcher.schedule(Box::pin(async move {
                ran.fetch_add(1, Ordering::SeqCst);
            }));
        }
        dispatcher.shutdown().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn survives_a_panicking_task() {
        let dispatcher = QueueDispatcher::new(4);
        let ran = Arc::new(AtomicUsize::new(0));
        dispatcher.schedule(Box::pin(async {
            panic!("boom");
        }));
        let after = ran.clone();
        dispatcher.schedule(Box::pin(async move {
            after.fetch_add(1, Ordering::SeqCst);
        }));
        dispatcher.shutdown().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn schedule_after_shutdown_is_dropped() {
        let dispatcher = QueueDispatcher::new(4);
        dispatcher.shutdown().await;
        let ran = Arc::new(AtomicUsize::new(0));
        let flag = ran.clone();
        dispatcher.schedule(Box::pin(async move {
            flag.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
