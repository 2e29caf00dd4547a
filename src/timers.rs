//! Cancellable timer handles guarding aggregate state
//!
//! Every pending timer is a spawned sleep task plus a token. Cancellation
//! aborts the task; a timer already mid-fire revalidates its token under the
//! owning aggregate's lock before acting, so cancellation and firing can race
//! safely.

use tokio::task::JoinHandle;

/// A pending cancellable timer owned by an aggregate
pub(crate) struct PendingTimer {
    pub(crate) token: u64,
    pub(crate) task: JoinHandle<()>,
}

impl PendingTimer {
    pub(crate) fn cancel(self) {
        self.task.abort();
    }
}
