//! `SingleOneTime(factory)` and `MultipleOneTime(factory, pool_size)`: build
//! a fresh argument per task, activate, execute, then deactivate on a
//! fire-and-forget continuation (`SPEC_FULL.md` §4.3). The continuations
//! are tracked so [`ArgumentProcessor::drain`] can await them at shutdown.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use taskforge_core::{
    CancellationToken, Result, ServiceRegistry, StartStoppable, TaskSource, TaskforgeError,
};

use crate::traits::{ArgumentFactory, ArgumentProcessor};

fn spawn_teardown<Arg>(arg: Arc<Arg>, cancel: CancellationToken) -> JoinHandle<()>
where
    Arg: StartStoppable + Send + Sync + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = arg.deactivate(&cancel).await {
            tracing::warn!(error = %err, "one-time argument teardown failed");
        }
    })
}

async fn reap(cleanup: &AsyncMutex<Vec<JoinHandle<()>>>) {
    let mut guard = cleanup.lock().await;
    guard.retain(|handle| !handle.is_finished());
}

async fn drain_all(cleanup: &AsyncMutex<Vec<JoinHandle<()>>>) {
    let handles: Vec<_> = std::mem::take(&mut *cleanup.lock().await);
    for handle in handles {
        let _ = handle.await;
    }
}

/// Build-per-task, single concurrent execution.
pub struct SingleOneTimeProcessor<Arg, F> {
    factory: F,
    cleanup: AsyncMutex<Vec<JoinHandle<()>>>,
    _marker: std::marker::PhantomData<Arg>,
}

impl<Arg, F> SingleOneTimeProcessor<Arg, F>
where
    Arg: StartStoppable + Send + Sync + 'static,
    F: ArgumentFactory<Arg>,
{
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            cleanup: AsyncMutex::new(Vec::new()),
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<Arg, F, T> ArgumentProcessor<Arc<Arg>, T> for SingleOneTimeProcessor<Arg, F>
where
    Arg: StartStoppable + Send + Sync + 'static,
    F: ArgumentFactory<Arg> + Send + Sync,
    T: Clone + Send + 'static,
{
    async fn process_pending<S>(
        &self,
        manager: &S,
        services: Arc<ServiceRegistry>,
        cancel: CancellationToken,
    ) where
        S: TaskSource<Arc<Arg>, T> + Send + Sync,
    {
        while manager.has_task() && !cancel.is_cancelled() {
            let Some((mut wrapper, meta)) = manager.get_task() else {
                continue;
            };

            let built = match self.factory.build() {
                Ok(built) => built,
                Err(err) => {
                    tracing::error!(error = %err, "one-time argument factory failed; reverting task");
                    manager.revert_task(wrapper, meta);
                    continue;
                }
            };
            if let Err(err) = built.activate(&cancel).await {
                tracing::error!(error = %err, "one-time argument activation failed; reverting task");
                manager.revert_task(wrapper, meta);
                continue;
            }
            if !built.is_active() {
                tracing::error!("one-time argument reported inactive after activate(); reverting task");
                manager.revert_task(wrapper, meta);
                continue;
            }

            let arg = Arc::new(built);
            let terminal = wrapper.execute(Arc::clone(&arg), Arc::clone(&services), &cancel).await;
            if !terminal {
                manager.revert_task(wrapper, meta);
            }

            let handle = spawn_teardown(arg, cancel.clone());
            self.cleanup.lock().await.push(handle);
            reap(&self.cleanup).await;
        }
    }

    async fn drain(&self) {
        drain_all(&self.cleanup).await;
    }
}

/// A fixed-size pool of build-per-task arguments, up to `pool_size` tasks
/// in flight at once.
pub struct MultipleOneTimeProcessor<Arg, F> {
    factory: F,
    pool_size: usize,
    cleanup: AsyncMutex<Vec<JoinHandle<()>>>,
    _marker: std::marker::PhantomData<Arg>,
}

impl<Arg, F> MultipleOneTimeProcessor<Arg, F>
where
    Arg: StartStoppable + Send + Sync + 'static,
    F: ArgumentFactory<Arg>,
{
    /// `pool_size` must be at least 1.
    pub fn new(factory: F, pool_size: usize) -> Result<Self> {
        if pool_size < 1 {
            return Err(TaskforgeError::ConfigurationError {
                reason: "pool_size must be >= 1".to_string(),
            });
        }
        Ok(Self {
            factory,
            pool_size,
            cleanup: AsyncMutex::new(Vec::new()),
            _marker: std::marker::PhantomData,
        })
    }
}

#[async_trait::async_trait]
impl<Arg, F, T> ArgumentProcessor<Arc<Arg>, T> for MultipleOneTimeProcessor<Arg, F>
where
    Arg: StartStoppable + Send + Sync + 'static,
    F: ArgumentFactory<Arg> + Send + Sync,
    T: Clone + Send + 'static,
{
    async fn process_pending<S>(
        &self,
        manager: &S,
        services: Arc<ServiceRegistry>,
        cancel: CancellationToken,
    ) where
        S: TaskSource<Arc<Arg>, T> + Send + Sync,
    {
        let mut in_flight = FuturesUnordered::new();
        loop {
            while in_flight.len() < self.pool_size && manager.has_task() && !cancel.is_cancelled() {
                let Some((mut wrapper, meta)) = manager.get_task() else {
                    break;
                };

                let built = match self.factory.build() {
                    Ok(built) => built,
                    Err(err) => {
                        tracing::error!(error = %err, "one-time argument factory failed; reverting task");
                        manager.revert_task(wrapper, meta);
                        continue;
                    }
                };
                if let Err(err) = built.activate(&cancel).await {
                    tracing::error!(error = %err, "one-time argument activation failed; reverting task");
                    manager.revert_task(wrapper, meta);
                    continue;
                }
                if !built.is_active() {
                    tracing::error!("one-time argument reported inactive after activate(); reverting task");
                    manager.revert_task(wrapper, meta);
                    continue;
                }

                let arg = Arc::new(built);
                let services = Arc::clone(&services);
                let cancel_for_exec = cancel.clone();
                in_flight.push(async move {
                    let terminal = wrapper
                        .execute(Arc::clone(&arg), services, &cancel_for_exec)
                        .await;
                    (arg, wrapper, meta, terminal)
                });
            }
            if in_flight.is_empty() {
                break;
            }
            if let Some((arg, wrapper, meta, terminal)) = in_flight.next().await {
                if !terminal {
                    manager.revert_task(wrapper, meta);
                }
                let handle = spawn_teardown(arg, cancel.clone());
                self.cleanup.lock().await.push(handle);
            }
        }
        reap(&self.cleanup).await;
    }

    async fn drain(&self) {
        drain_all(&self.cleanup).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inert::Inert;
    use std::sync::atomic::{AtomicU32, Ordering};
    use taskforge_core::TaskKind;
    use taskforge_queues::SimpleQueueManager;

    #[tokio::test]
    async fn single_one_time_builds_a_fresh_argument_per_task() {
        let builds = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&builds);
        let factory = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Inert::new(()))
        };
        let processor = SingleOneTimeProcessor::new(factory);

        let manager: SimpleQueueManager<Arc<Inert<()>>, ()> = SimpleQueueManager::new();
        for _ in 0..4 {
            manager.submit(TaskKind::sync(|_arg, _| Ok(())), 1, CancellationToken::new());
        }
        processor
            .process_pending(&manager, Arc::new(ServiceRegistry::new()), CancellationToken::new())
            .await;
        processor.drain().await;

        assert_eq!(builds.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn factory_failure_reverts_and_keeps_responding_to_cancel() {
        // A factory that always fails reverts the task every iteration, so
        // the pump only ever stops via cancellation -- exercise that it
        // does, rather than spinning forever.
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let factory = move || -> Result<Inert<()>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(TaskforgeError::ResourceActivationError {
                reason: "boom".to_string(),
            })
        };
        let processor = Arc::new(SingleOneTimeProcessor::new(factory));
        let manager = Arc::new(SimpleQueueManager::<Arc<Inert<()>>, ()>::new());
        manager.submit(TaskKind::sync(|_arg, _| Ok(())), 1, CancellationToken::new());

        let cancel = CancellationToken::new();
        let pump_processor = Arc::clone(&processor);
        let pump_manager = Arc::clone(&manager);
        let pump_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            pump_processor
                .process_pending(&*pump_manager, Arc::new(ServiceRegistry::new()), pump_cancel)
                .await;
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("pump must respond to cancellation")
            .expect("pump task must not panic");

        assert!(attempts.load(Ordering::SeqCst) > 0);
    }

    struct NeverActive;

    #[async_trait::async_trait]
    impl StartStoppable for NeverActive {
        fn is_active(&self) -> bool {
            false
        }

        async fn activate(&self, _cancel: &CancellationToken) -> Result<()> {
            Ok(())
        }

        async fn deactivate(&self, _cancel: &CancellationToken) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn reverts_without_executing_when_still_inactive_after_activate() {
        let ran = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ran);
        let processor = Arc::new(SingleOneTimeProcessor::new(|| Ok(NeverActive)));
        let manager = Arc::new(SimpleQueueManager::<Arc<NeverActive>, ()>::new());
        manager.submit(
            TaskKind::sync(move |_arg, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            1,
            CancellationToken::new(),
        );

        let cancel = CancellationToken::new();
        let pump_processor = Arc::clone(&processor);
        let pump_manager = Arc::clone(&manager);
        let pump_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            pump_processor
                .process_pending(&*pump_manager, Arc::new(ServiceRegistry::new()), pump_cancel)
                .await;
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("pump must respond to cancellation")
            .expect("pump task must not panic");

        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
