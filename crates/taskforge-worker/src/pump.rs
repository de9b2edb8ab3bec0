//! `TaskWorker`: one pump per manager. `Start`/`Stop` per `SPEC_FULL.md`
//! §4.4 -- `while has_task { process_pending }`, else `wait_for_task`,
//! calling the processor's idle hook right before suspending.

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use taskforge_core::{CancellationToken, ServiceRegistry, TaskSource};
use taskforge_processors::ArgumentProcessor;

/// Owns the background task driving one manager's pending wrappers through
/// one argument-acquisition policy.
pub struct TaskWorker {
    cancel: CancellationToken,
    handle: AsyncMutex<Option<JoinHandle<()>>>,
}

impl TaskWorker {
    /// Spawn the pump and return a handle to it, already running.
    pub fn start<S, P, Arg, T>(manager: Arc<S>, processor: Arc<P>, services: Arc<ServiceRegistry>) -> Self
    where
        S: TaskSource<Arg, T> + Send + Sync + 'static,
        P: ArgumentProcessor<Arg, T> + Send + Sync + 'static,
        Arg: Send + 'static,
        T: Clone + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                if worker_cancel.is_cancelled() {
                    break;
                }
                if manager.has_task() {
                    processor
                        .process_pending(&*manager, Arc::clone(&services), worker_cancel.clone())
                        .await;
                } else {
                    processor.on_idle().await;
                    manager.wait_for_task(&worker_cancel).await;
                }
            }
            // Anything still sitting in the manager was reverted mid-flight
            // (its attempt credited back) or never picked up at all -- the
            // pump is exiting and is never coming back for it, so settle it
            // here instead of leaving its completion handle pending forever.
            while manager.has_task() {
                match manager.get_task() {
                    Some((wrapper, _metadata)) => wrapper.abandon(),
                    None => break,
                }
            }
            processor.drain().await;
            tracing::debug!("task worker pump stopped");
        });

        tracing::info!("task worker pump started");
        Self {
            cancel,
            handle: AsyncMutex::new(Some(handle)),
        }
    }

    /// Signal cancellation and wait for the pump to drain in-flight
    /// teardown continuations and exit.
    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "task worker pump panicked");
            }
        }
    }

    /// Whether `stop` has been requested.
    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use taskforge_core::{ServiceRegistry, TaskKind};
    use taskforge_processors::NullArgumentProcessor;
    use taskforge_queues::SimpleQueueManager;

    #[tokio::test]
    async fn worker_drains_submitted_tasks() {
        let manager = Arc::new(SimpleQueueManager::<(), u32>::new());
        let processor = Arc::new(NullArgumentProcessor::new());
        let completed = Arc::new(AtomicU32::new(0));

        let worker = TaskWorker::start(
            Arc::clone(&manager),
            processor,
            Arc::new(ServiceRegistry::new()),
        );

        for _ in 0..5 {
            let completed = Arc::clone(&completed);
            manager.submit(
                TaskKind::sync(move |(), _| {
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                }),
                1,
                CancellationToken::new(),
            );
        }

        tokio::time::timeout(Duration::from_secs(1), async {
            while completed.load(Ordering::SeqCst) < 5 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("worker must process all submitted tasks");

        worker.stop().await;
        assert!(worker.is_stopping());
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_returns_after_pump_exits() {
        let manager = Arc::new(SimpleQueueManager::<(), ()>::new());
        let processor = Arc::new(NullArgumentProcessor::new());
        let worker = TaskWorker::start(manager, processor, Arc::new(ServiceRegistry::new()));

        tokio::time::timeout(Duration::from_secs(1), worker.stop())
            .await
            .expect("stop must not hang");
        tokio::time::timeout(Duration::from_secs(1), worker.stop())
            .await
            .expect("second stop must be a no-op, not hang");
    }

    #[tokio::test]
    async fn stop_settles_abandoned_in_flight_work_canceled_by_shutdown() {
        use taskforge_core::Outcome;

        let manager = Arc::new(SimpleQueueManager::<(), u32>::new());
        let processor = Arc::new(NullArgumentProcessor::new());
        let worker = TaskWorker::start(
            Arc::clone(&manager),
            processor,
            Arc::new(ServiceRegistry::new()),
        );

        // A cooperative body that blocks until it's told to stop, never
        // returning on its own -- the worker can only get rid of it via
        // shutdown.
        let completion = manager.submit(
            TaskKind::asynchronous(|(), _services, cancel| async move {
                cancel.cancelled().await;
                Ok(1)
            }),
            1,
            CancellationToken::new(),
        );

        // Give the pump a chance to pick the task up and start executing it
        // before shutdown fires.
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), worker.stop())
            .await
            .expect("stop must not hang even with in-flight work");

        assert!(matches!(
            completion.try_get(),
            Some(Outcome::Canceled(taskforge_core::CancelOrigin::Shutdown))
        ));
    }
}
