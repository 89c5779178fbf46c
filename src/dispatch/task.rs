use tokio::runtime::Handle;

use crate::dispatch::{Dispatch, DispatchTask};

/// Spawns one Tokio task per dispatch.
///
/// Consumers scheduled for one notification run concurrently with each
/// other and with the notifier; nothing orders them. The dispatcher is
/// bound to a runtime handle at construction, so scheduling works from any
/// thread, including threads outside the runtime.
#[derive(Clone, Debug)]
pub struct TaskDispatcher {
    handle: Handle,
}

impl TaskDispatcher {
    /// Binds to the ambient runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime; use
    /// [`TaskDispatcher::from_handle`] there.
    pub fn new() -> Self {
        Self::from_handle(Handle::current())
    }

    /// Binds to the given runtime handle.
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Dispatch for TaskDispatcher {
    fn schedule(&self, task: DispatchTask) {
        self.handle.spawn(task);
    }
}
