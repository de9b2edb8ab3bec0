//! Access queue: a work queue whose argument is a serialized shared
//! resource `R`. Identical shape to `WorkQueueManager`, plus a
//! `max_attempts` ceiling applied at submit time.

use taskforge_core::{
    CancellationToken, CompletionHandle, Result, TaskKind, TaskSource, TaskWrapper, TaskforgeError,
};

use crate::simple::SimpleQueueManager;

/// Manager for a serialized, at-most-one-concurrent-mutator shared
/// resource `R`. The processor (not the manager) is responsible for
/// guaranteeing exclusivity; see `taskforge-processors::single_static`.
pub struct AccessQueueManager<R, T> {
    inner: SimpleQueueManager<R, T>,
    max_attempts: u32,
}

impl<R, T> AccessQueueManager<R, T>
where
    R: Send + 'static,
    T: Clone + Send + 'static,
{
    /// Create a manager that clamps submit-time attempts to
    /// `[1, max_attempts]`.
    pub fn new(max_attempts: u32) -> Result<Self> {
        if max_attempts < 1 {
            return Err(TaskforgeError::ConfigurationError {
                reason: "max_attempts must be >= 1".to_string(),
            });
        }
        Ok(Self {
            inner: SimpleQueueManager::new(),
            max_attempts,
        })
    }

    /// The configured attempts ceiling.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Submit a task against the shared resource, clamping `attempts` into
    /// `[1, max_attempts]`.
    pub fn submit(
        &self,
        task: TaskKind<R, T>,
        attempts: u32,
        cancel: CancellationToken,
    ) -> CompletionHandle<T> {
        let clamped = attempts.clamp(1, self.max_attempts);
        self.inner.submit(task, clamped, cancel)
    }

    /// Expose the underlying FIFO manager directly.
    #[must_use]
    pub fn source(&self) -> &SimpleQueueManager<R, T> {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<R, T> TaskSource<R, T> for AccessQueueManager<R, T>
where
    R: Send + 'static,
    T: Clone + Send + 'static,
{
    type Metadata = ();

    fn has_task(&self) -> bool {
        self.inner.has_task()
    }

    async fn wait_for_task(&self, cancel: &CancellationToken) {
        self.inner.wait_for_task(cancel).await;
    }

    fn get_task(&self) -> Option<(TaskWrapper<R, T>, Self::Metadata)> {
        self.inner.get_task()
    }

    fn revert_task(&self, wrapper: TaskWrapper<R, T>, metadata: Self::Metadata) {
        self.inner.revert_task(wrapper, metadata);
    }
}
