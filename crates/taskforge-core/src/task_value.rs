//! Task values: immutable descriptions of one unit of work.
//!
//! A [`TaskKind`] is a tagged sum type over a synchronous and an
//! asynchronous variant, per the design note preferring sum types over
//! virtual dispatch where the target language offers them. `Work<T>` and
//! `Access<R, T>` (spec vocabulary) are both just `TaskKind` instantiated
//! over the argument type the processor will supply.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::registry::ServiceRegistry;

/// A boxed, `'static` future, used for the async variant of a task value.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

type SyncBody<Arg, T> = dyn Fn(Arg, &ServiceRegistry) -> Result<T> + Send + Sync;
type AsyncBody<Arg, T> =
    dyn Fn(Arg, Arc<ServiceRegistry>, CancellationToken) -> BoxFuture<Result<T>> + Send + Sync;

/// An immutable, shared-read-only task description.
///
/// `Arg` is whatever the processor's argument policy supplies (`()` for
/// `NullArgument`, a shared resource handle for an access queue, a conveyor
/// machine handle for a conveyor). `T` is the produced result, `()` for
/// void-returning work.
#[derive(Clone)]
pub enum TaskKind<Arg, T> {
    /// Runs in-thread; must not block the executor for long.
    Sync(Arc<SyncBody<Arg, T>>),
    /// Awaited under the effective (inner-or-outer) cancellation token.
    Async(Arc<AsyncBody<Arg, T>>),
}

impl<Arg, T> TaskKind<Arg, T>
where
    Arg: Send + 'static,
    T: Send + 'static,
{
    /// Build a synchronous task value.
    pub fn sync<F>(body: F) -> Self
    where
        F: Fn(Arg, &ServiceRegistry) -> Result<T> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(body))
    }

    /// Build an asynchronous task value.
    pub fn asynchronous<F, Fut>(body: F) -> Self
    where
        F: Fn(Arg, Arc<ServiceRegistry>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self::Async(Arc::new(move |arg, services, cancel| {
            Box::pin(body(arg, services, cancel))
        }))
    }
}

/// Spec vocabulary alias: work needing no shared argument.
pub type Work<T = ()> = TaskKind<(), T>;

/// Spec vocabulary alias: work executed against a serialized shared
/// resource `R`.
pub type Access<R, T = ()> = TaskKind<R, T>;

/// Lifecycle contract for processor-managed arguments that need
/// activation/deactivation around each use (`SingleOneTime`/`MultipleOneTime`,
/// and the idle-teardown path of `SingleReusable`/`MultipleReusable`).
#[async_trait::async_trait]
pub trait StartStoppable: Send + Sync {
    /// Whether the argument is currently active and safe to execute with.
    fn is_active(&self) -> bool;

    /// Bring the argument into an active state.
    async fn activate(&self, cancel: &CancellationToken) -> Result<()>;

    /// Tear the argument back down. Called fire-and-forget after a
    /// `OneTime` execution, or after a `Reusable` argument's idle timeout.
    async fn deactivate(&self, cancel: &CancellationToken) -> Result<()>;
}

/// A stateful, pooled multi-stage pipeline stage: the processor's argument
/// for a conveyor manager. `D` is the input data type, `R` the stage's
/// output.
#[async_trait::async_trait]
pub trait ConveyorMachine<D, R>: Send + Sync
where
    D: Send + 'static,
    R: Send + 'static,
{
    /// Upper bound on attempts this stage will tolerate for one data item.
    fn max_attempts(&self) -> u32 {
        1
    }

    /// Process one data item, yielding the stage's output.
    async fn process(
        &self,
        data: D,
        attempts_remaining: u32,
        cancel: CancellationToken,
    ) -> Result<R>;
}
