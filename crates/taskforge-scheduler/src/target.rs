//! `EnqueueTarget`: the "queued" inner-payload form (`SPEC_FULL.md` §4.5b)
//! -- on fire, forward the scheduled task value into a named work queue
//! rather than executing it directly in the scheduler's own pump.

use taskforge_core::{CancellationToken, CompletionHandle, TaskKind};
use taskforge_queues::{PriorityQueueManager, SimpleQueueManager};

/// Something a scheduled, argument-less task value can be enqueued into.
pub trait EnqueueTarget<T>: Send + Sync
where
    T: Clone + Send + 'static,
{
    fn enqueue(
        &self,
        task: TaskKind<(), T>,
        attempts: u32,
        cancel: CancellationToken,
    ) -> CompletionHandle<T>;
}

impl<T> EnqueueTarget<T> for SimpleQueueManager<(), T>
where
    T: Clone + Send + 'static,
{
    fn enqueue(
        &self,
        task: TaskKind<(), T>,
        attempts: u32,
        cancel: CancellationToken,
    ) -> CompletionHandle<T> {
        self.submit(task, attempts, cancel)
    }
}

/// Wraps a priority work queue with a fixed submission priority, since
/// `EnqueueTarget` carries no priority parameter of its own.
pub struct AtPriorityFor<T> {
    pub manager: PriorityQueueManager<(), T>,
    pub priority: u8,
}

impl<T> EnqueueTarget<T> for AtPriorityFor<T>
where
    T: Clone + Send + 'static,
{
    fn enqueue(
        &self,
        task: TaskKind<(), T>,
        attempts: u32,
        cancel: CancellationToken,
    ) -> CompletionHandle<T> {
        match self.manager.submit(task, attempts, self.priority, cancel) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::error!(error = %err, "scheduled work rejected by priority queue");
                let handle = CompletionHandle::new();
                handle.settle(taskforge_core::Outcome::Failure(err.to_string()));
                handle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use taskforge_core::Outcome;

    #[test]
    fn simple_queue_manager_enqueues_directly() {
        let manager: SimpleQueueManager<(), u32> = SimpleQueueManager::new();
        let target: &dyn EnqueueTarget<u32> = &manager;
        target.enqueue(TaskKind::sync(|(), _| Ok(1)), 1, CancellationToken::new());
        assert!(manager.has_task());
    }

    #[test]
    fn priority_target_settles_failure_on_invalid_priority() {
        let target = AtPriorityFor::<u32> {
            manager: PriorityQueueManager::new(1),
            priority: 9,
        };
        let handle = target.enqueue(TaskKind::sync(|(), _| Ok(1)), 1, CancellationToken::new());
        assert!(matches!(handle.try_get(), Some(Outcome::Failure(_))));
    }

    #[test]
    fn priority_target_enqueues_at_configured_priority() {
        let target = Arc::new(AtPriorityFor::<u32> {
            manager: PriorityQueueManager::new(2),
            priority: 1,
        });
        target.enqueue(TaskKind::sync(|(), _| Ok(1)), 1, CancellationToken::new());
        assert!(target.manager.has_task());
    }
}
