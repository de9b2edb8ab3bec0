//! The single-lane FIFO manager underlying `WorkQueueManager`, the access
//! queue, and the conveyor manager, grounded on
//! `openintent-kernel::scheduler`'s `SegQueue` + `Notify` pairing.

use crossbeam::queue::SegQueue;
use tokio::sync::Notify;

use taskforge_core::{CancellationToken, CompletionHandle, TaskKind, TaskSource, TaskWrapper};

/// A single FIFO of pending wrappers plus an auto-reset "new task" signal.
pub struct SimpleQueueManager<Arg, T> {
    queue: SegQueue<TaskWrapper<Arg, T>>,
    notify: Notify,
}

impl<Arg, T> SimpleQueueManager<Arg, T>
where
    Arg: Send + 'static,
    T: Clone + Send + 'static,
{
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
            notify: Notify::new(),
        }
    }

    /// Submit a task value for execution, returning the caller's completion
    /// handle.
    pub fn submit(
        &self,
        task: TaskKind<Arg, T>,
        attempts: u32,
        cancel: CancellationToken,
    ) -> CompletionHandle<T> {
        let (wrapper, completion) = TaskWrapper::new(task, attempts, cancel);
        self.queue.push(wrapper);
        self.notify.notify_one();
        completion
    }

    async fn wait_for_notify_or_cancel(&self, cancel: &CancellationToken) {
        loop {
            if !self.queue.is_empty() || cancel.is_cancelled() {
                return;
            }
            let notified = self.notify.notified();
            if !self.queue.is_empty() || cancel.is_cancelled() {
                return;
            }
            tokio::select! {
                () = notified => {},
                () = cancel.cancelled() => {},
            }
        }
    }
}

impl<Arg, T> Default for SimpleQueueManager<Arg, T>
where
    Arg: Send + 'static,
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<Arg, T> TaskSource<Arg, T> for SimpleQueueManager<Arg, T>
where
    Arg: Send + 'static,
    T: Clone + Send + 'static,
{
    type Metadata = ();

    fn has_task(&self) -> bool {
        !self.queue.is_empty()
    }

    async fn wait_for_task(&self, cancel: &CancellationToken) {
        self.wait_for_notify_or_cancel(cancel).await;
    }

    fn get_task(&self) -> Option<(TaskWrapper<Arg, T>, Self::Metadata)> {
        self.queue.pop().map(|wrapper| (wrapper, ()))
    }

    fn revert_task(&self, wrapper: TaskWrapper<Arg, T>, (): Self::Metadata) {
        self.queue.push(wrapper);
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskforge_core::ServiceRegistry;
    use std::sync::Arc;

    #[tokio::test]
    async fn submit_then_get_task_fifo_order() {
        let manager: SimpleQueueManager<(), u32> = SimpleQueueManager::new();
        manager.submit(TaskKind::sync(|(), _| Ok(1)), 1, CancellationToken::new());
        manager.submit(TaskKind::sync(|(), _| Ok(2)), 1, CancellationToken::new());

        assert!(manager.has_task());
        let (mut first, meta) = manager.get_task().expect("first task");
        let services = Arc::new(ServiceRegistry::new());
        first.execute((), Arc::clone(&services), &CancellationToken::new()).await;
        manager.revert_task(first, meta); // exercise revert path even though terminal
        let (_second, _) = manager.get_task().expect("second task");
    }

    #[tokio::test]
    async fn wait_for_task_returns_immediately_when_nonempty() {
        let manager: SimpleQueueManager<(), u32> = SimpleQueueManager::new();
        manager.submit(TaskKind::sync(|(), _| Ok(1)), 1, CancellationToken::new());
        tokio::time::timeout(
            std::time::Duration::from_millis(50),
            manager.wait_for_task(&CancellationToken::new()),
        )
        .await
        .expect("must not block when a task is already pending");
    }

    #[tokio::test]
    async fn wait_for_task_wakes_on_submit() {
        let manager: Arc<SimpleQueueManager<(), u32>> = Arc::new(SimpleQueueManager::new());
        let waiter_manager = Arc::clone(&manager);
        let cancel = CancellationToken::new();
        let waiter_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            waiter_manager.wait_for_task(&waiter_cancel).await;
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        manager.submit(TaskKind::sync(|(), _| Ok(1)), 1, CancellationToken::new());

        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake on submit")
            .expect("task should not panic");
    }

    #[tokio::test]
    async fn wait_for_task_wakes_on_cancel() {
        let manager: Arc<SimpleQueueManager<(), u32>> = Arc::new(SimpleQueueManager::new());
        let waiter_manager = Arc::clone(&manager);
        let cancel = CancellationToken::new();
        let waiter_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            waiter_manager.wait_for_task(&waiter_cancel).await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake on cancel")
            .expect("task should not panic");
    }
}
