//! The processor contract: "all processors implement `ProcessPendingTasks`,
//! pumping while the manager has tasks and cancel is unset" (`SPEC_FULL.md`
//! §4.3).

use std::sync::Arc;

use taskforge_core::{CancellationToken, Result, ServiceRegistry, TaskSource};

/// An argument-acquisition policy: decides what `Arg` a manager's pending
/// wrappers get executed with, and how that argument's lifecycle (if any)
/// is managed.
#[async_trait::async_trait]
pub trait ArgumentProcessor<Arg, T>: Send + Sync
where
    Arg: Send + 'static,
    T: Clone + Send + 'static,
{
    /// Drain `manager` of pending wrappers, executing each against this
    /// policy's argument(s), until the manager is empty or `cancel` fires.
    async fn process_pending<S>(
        &self,
        manager: &S,
        services: Arc<ServiceRegistry>,
        cancel: CancellationToken,
    ) where
        S: TaskSource<Arg, T> + Send + Sync;

    /// Called by the worker pump each time it has drained the manager and
    /// is about to suspend on `wait_for_task` -- the idle boundary
    /// `SingleReusable`/`MultipleReusable` use to tear down an idle
    /// argument. No-op for policies with nothing to tear down.
    async fn on_idle(&self) {}

    /// Await any fire-and-forget teardown continuations this processor has
    /// spawned (the `OneTime` policies' post-execution deactivation).
    /// Called by `TaskWorker::stop` so shutdown doesn't leak detached tasks.
    /// No-op for policies that spawn none.
    async fn drain(&self) {}
}

/// Shared by every `*OneTime`/`*Reusable` factory: build one argument
/// instance, or fail with a reason the caller logs and reverts on.
pub trait ArgumentFactory<Arg>: Send + Sync {
    fn build(&self) -> Result<Arg>;
}

impl<Arg, F> ArgumentFactory<Arg> for F
where
    F: Fn() -> Result<Arg> + Send + Sync,
{
    fn build(&self) -> Result<Arg> {
        self()
    }
}
