//! The worker-side contract every task manager implements.
//!
//! Decouples `taskforge-processors`/`taskforge-worker` from the concrete
//! manager shapes in `taskforge-queues`: a processor only needs
//! `has_task`/`wait_for_task`/`get_task`/`revert_task`, named directly after
//! `SPEC_FULL.md` §4.2.

use crate::cancel::CancellationToken;
use crate::wrapper::TaskWrapper;

/// Worker-side surface of a pending-task manager.
#[async_trait::async_trait]
pub trait TaskSource<Arg, T>: Send + Sync
where
    Arg: Send + 'static,
    T: Clone + Send + 'static,
{
    /// Per-wrapper bookkeeping a manager needs back on `revert_task` (e.g.
    /// the originating priority lane).
    type Metadata: Send + 'static;

    /// Non-blocking: is there at least one pending wrapper?
    fn has_task(&self) -> bool;

    /// Suspend until a wrapper is pending or `cancel` fires. Returns
    /// immediately if already non-empty.
    async fn wait_for_task(&self, cancel: &CancellationToken);

    /// Try to pop one pending wrapper. May spuriously return `None` under
    /// concurrent submit/revert; callers re-check `has_task` rather than
    /// treat this as exhaustion (see `SPEC_FULL.md` §9).
    fn get_task(&self) -> Option<(TaskWrapper<Arg, T>, Self::Metadata)>;

    /// Push a non-terminal wrapper back for a later attempt.
    fn revert_task(&self, wrapper: TaskWrapper<Arg, T>, metadata: Self::Metadata);
}
