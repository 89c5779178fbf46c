//! Deferred-emission machinery.
//!
//! A source built from pre-bound values does not emit them at construction;
//! the first terminal operation (`wait`/`get`) drives the emission, exactly
//! once, through [`EmitGate`]. Derived nodes do not own a gate — they
//! delegate upstream through [`Trigger`] until the chain reaches the source.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

/// Emission phase of a deferred source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AcceptPhase {
    /// Nothing emitted yet.
    Delayed,
    /// One caller is emitting the pre-bound values.
    Accepting,
    /// Emission finished.
    Accepted,
}

/// Once-only emission gate.
///
/// The phase lock is disjoint from the node's data latch; when both are
/// held, the phase lock is acquired first.
pub(crate) struct EmitGate {
    pub(crate) phase: Mutex<AcceptPhase>,
    pub(crate) done: Notify,
}

impl EmitGate {
    pub(crate) fn new() -> Self {
        Self {
            phase: Mutex::new(AcceptPhase::Delayed),
            done: Notify::new(),
        }
    }

    /// Waits until the emitting caller marks the gate [`AcceptPhase::Accepted`].
    pub(crate) async fn wait_done(&self) {
        loop {
            let done = self.done.notified();
            tokio::pin!(done);
            done.as_mut().enable();
            if *self.phase.lock().unwrap() == AcceptPhase::Accepted {
                return;
            }
            done.await;
        }
    }
}

/// Upstream hook: a derived node triggers its parent's deferred emission
/// (and, transitively, the source's) before it can observe any values.
#[async_trait]
pub(crate) trait Trigger: Send + Sync {
    async fn propagate(&self);
}
