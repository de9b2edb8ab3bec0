//! `SingleStatic(arg)` and `MultipleStatic([arg...])`: policies over a
//! fixed, caller-supplied argument value (or pool of values) that needs no
//! activation lifecycle (`SPEC_FULL.md` §4.3).

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use taskforge_core::{CancellationToken, Result, ServiceRegistry, TaskSource, TaskforgeError};

use crate::traits::ArgumentProcessor;

/// Always executes against the same cloned argument; a single slot, so
/// mutual exclusion is automatic.
pub struct SingleStaticProcessor<Arg> {
    arg: Arg,
}

impl<Arg> SingleStaticProcessor<Arg>
where
    Arg: Clone,
{
    #[must_use]
    pub fn new(arg: Arg) -> Self {
        Self { arg }
    }
}

#[async_trait::async_trait]
impl<Arg, T> ArgumentProcessor<Arg, T> for SingleStaticProcessor<Arg>
where
    Arg: Clone + Send + Sync + 'static,
    T: Clone + Send + 'static,
{
    async fn process_pending<S>(
        &self,
        manager: &S,
        services: Arc<ServiceRegistry>,
        cancel: CancellationToken,
    ) where
        S: TaskSource<Arg, T> + Send + Sync,
    {
        while manager.has_task() && !cancel.is_cancelled() {
            let Some((mut wrapper, meta)) = manager.get_task() else {
                continue;
            };
            let terminal = wrapper
                .execute(self.arg.clone(), Arc::clone(&services), &cancel)
                .await;
            if !terminal {
                manager.revert_task(wrapper, meta);
            }
        }
    }
}

/// A fixed pool of argument values; concurrency equals the pool size, and
/// each in-flight execution holds its own slot so no value is used by two
/// executions at once.
pub struct MultipleStaticProcessor<Arg> {
    pool: Vec<Arg>,
}

impl<Arg> MultipleStaticProcessor<Arg>
where
    Arg: Clone,
{
    /// `pool` must be non-empty.
    pub fn new(pool: Vec<Arg>) -> Result<Self> {
        if pool.is_empty() {
            return Err(TaskforgeError::ConfigurationError {
                reason: "argument pool must be non-empty".to_string(),
            });
        }
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl<Arg, T> ArgumentProcessor<Arg, T> for MultipleStaticProcessor<Arg>
where
    Arg: Clone + Send + Sync + 'static,
    T: Clone + Send + 'static,
{
    async fn process_pending<S>(
        &self,
        manager: &S,
        services: Arc<ServiceRegistry>,
        cancel: CancellationToken,
    ) where
        S: TaskSource<Arg, T> + Send + Sync,
    {
        let mut free: VecDeque<usize> = (0..self.pool.len()).collect();
        let mut in_flight = FuturesUnordered::new();

        loop {
            while !free.is_empty() && manager.has_task() && !cancel.is_cancelled() {
                let Some((mut wrapper, meta)) = manager.get_task() else {
                    break;
                };
                let idx = free.pop_front().expect("checked non-empty above");
                let arg = self.pool[idx].clone();
                let services = Arc::clone(&services);
                let cancel = cancel.clone();
                in_flight.push(async move {
                    let terminal = wrapper.execute(arg, services, &cancel).await;
                    (idx, wrapper, meta, terminal)
                });
            }
            if in_flight.is_empty() {
                break;
            }
            if let Some((idx, wrapper, meta, terminal)) = in_flight.next().await {
                free.push_back(idx);
                if !terminal {
                    manager.revert_task(wrapper, meta);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use taskforge_core::TaskKind;
    use taskforge_queues::SimpleQueueManager;

    #[tokio::test]
    async fn single_static_always_sees_the_configured_argument() {
        let manager: SimpleQueueManager<u32, u32> = SimpleQueueManager::new();
        manager.submit(
            TaskKind::sync(|arg: u32, _| Ok(arg * 10)),
            1,
            CancellationToken::new(),
        );
        let processor = SingleStaticProcessor::new(7u32);
        processor
            .process_pending(&manager, Arc::new(ServiceRegistry::new()), CancellationToken::new())
            .await;
        assert!(!manager.has_task());
    }

    #[tokio::test]
    async fn multiple_static_never_uses_one_pool_slot_concurrently() {
        let manager: SimpleQueueManager<u32, ()> = SimpleQueueManager::new();
        let in_use = Arc::new(Mutex::new(HashSet::<u32>::new()));
        for _ in 0..12 {
            let in_use = Arc::clone(&in_use);
            manager.submit(
                TaskKind::asynchronous(move |arg: u32, _services, _cancel| {
                    let in_use = Arc::clone(&in_use);
                    async move {
                        assert!(in_use.lock().unwrap().insert(arg), "slot reused concurrently");
                        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                        in_use.lock().unwrap().remove(&arg);
                        Ok(())
                    }
                }),
                1,
                CancellationToken::new(),
            );
        }

        let processor = MultipleStaticProcessor::new(vec![1u32, 2, 3]).unwrap();
        processor
            .process_pending(&manager, Arc::new(ServiceRegistry::new()), CancellationToken::new())
            .await;
        assert!(!manager.has_task());
    }

    #[test]
    fn empty_pool_is_a_configuration_error() {
        let result = MultipleStaticProcessor::<u32>::new(Vec::new());
        assert!(matches!(result, Err(TaskforgeError::ConfigurationError { .. })));
    }
}
