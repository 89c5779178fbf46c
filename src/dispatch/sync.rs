use crate::dispatch::{Dispatch, DispatchTask};

/// Runs every task inline on the caller.
///
/// Execution happens on the notifying thread before `schedule` returns,
/// which makes delivery deterministic. Consumers dispatched this way must
/// not await runtime resources; the engine's internal consumers never do.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncDispatcher;

impl SyncDispatcher {
    pub fn new() -> Self {
        Self
    }
}

impl Dispatch for SyncDispatcher {
    fn schedule(&self, task: DispatchTask) {
        futures::executor::block_on(task);
    }
}
