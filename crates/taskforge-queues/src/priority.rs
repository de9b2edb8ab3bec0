//! Priority-partitioned FIFO manager underlying `PriorityWorkQueueManager`
//! and `PriorityConveyorManager`, grounded on
//! `openintent-kernel::scheduler`'s four priority lanes.
//!
//! Open question resolved (`SPEC_FULL.md` §9): priority is scanned
//! **highest-first** — lane `max_priority` is drained before lane `0`.

use crossbeam::queue::SegQueue;
use tokio::sync::Notify;

use taskforge_core::{
    CancellationToken, CompletionHandle, Result, TaskKind, TaskSource, TaskforgeError, TaskWrapper,
};

/// A priority-partitioned FIFO: `max_priority + 1` lanes, scanned
/// highest-first on dequeue.
pub struct PriorityQueueManager<Arg, T> {
    lanes: Vec<SegQueue<TaskWrapper<Arg, T>>>,
    max_priority: u8,
    notify: Notify,
}

impl<Arg, T> PriorityQueueManager<Arg, T>
where
    Arg: Send + 'static,
    T: Clone + Send + 'static,
{
    /// Create a manager with lanes `0..=max_priority`.
    #[must_use]
    pub fn new(max_priority: u8) -> Self {
        let lanes = (0..=max_priority).map(|_| SegQueue::new()).collect();
        Self {
            lanes,
            max_priority,
            notify: Notify::new(),
        }
    }

    /// The highest legal priority value (`lanes.len() - 1`).
    #[must_use]
    pub fn max_priority(&self) -> u8 {
        self.max_priority
    }

    /// Submit a task at `priority`, validating it against `max_priority`.
    pub fn submit(
        &self,
        task: TaskKind<Arg, T>,
        attempts: u32,
        priority: u8,
        cancel: CancellationToken,
    ) -> Result<CompletionHandle<T>> {
        let lane = self.lanes.get(priority as usize).ok_or_else(|| {
            TaskforgeError::ArgumentInvalid {
                reason: format!(
                    "priority {priority} exceeds max_priority {}",
                    self.max_priority
                ),
            }
        })?;
        let (wrapper, completion) = TaskWrapper::new(task, attempts, cancel);
        lane.push(wrapper);
        self.notify.notify_one();
        Ok(completion)
    }

    async fn wait_for_notify_or_cancel(&self, cancel: &CancellationToken) {
        loop {
            if self.has_task() || cancel.is_cancelled() {
                return;
            }
            let notified = self.notify.notified();
            if self.has_task() || cancel.is_cancelled() {
                return;
            }
            tokio::select! {
                () = notified => {},
                () = cancel.cancelled() => {},
            }
        }
    }
}

#[async_trait::async_trait]
impl<Arg, T> TaskSource<Arg, T> for PriorityQueueManager<Arg, T>
where
    Arg: Send + 'static,
    T: Clone + Send + 'static,
{
    /// The priority lane a wrapper came from, so `revert_task` puts it back
    /// in the same lane rather than at the default priority.
    type Metadata = u8;

    fn has_task(&self) -> bool {
        self.lanes.iter().any(|lane| !lane.is_empty())
    }

    async fn wait_for_task(&self, cancel: &CancellationToken) {
        self.wait_for_notify_or_cancel(cancel).await;
    }

    fn get_task(&self) -> Option<(TaskWrapper<Arg, T>, Self::Metadata)> {
        for priority in (0..=self.max_priority).rev() {
            if let Some(wrapper) = self.lanes[priority as usize].pop() {
                return Some((wrapper, priority));
            }
        }
        None
    }

    fn revert_task(&self, wrapper: TaskWrapper<Arg, T>, priority: Self::Metadata) {
        self.lanes[priority as usize].push(wrapper);
        self.notify.notify_one();
    }
}
