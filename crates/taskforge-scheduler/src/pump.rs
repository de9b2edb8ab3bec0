//! The scheduler's own pump, implementing the sleep-until-next-fire loop
//! from `SPEC_FULL.md` §4.5 verbatim: sleep until the earliest `next_fire`
//! or until a new (possibly earlier) entry breaks the sleep, then run every
//! due entry before sleeping again.

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use taskforge_core::{CancellationToken, ServiceRegistry};

use crate::manager::{Fired, WorkSchedulerManager};

/// Drives a [`WorkSchedulerManager`] until stopped. One `SchedulerPump` per
/// manager, mirroring `TaskWorker`'s one-pump-per-manager shape.
pub struct SchedulerPump {
    cancel: CancellationToken,
    handle: AsyncMutex<Option<JoinHandle<()>>>,
}

impl SchedulerPump {
    /// Spawn the pump loop.
    #[must_use]
    pub fn start<T>(manager: Arc<WorkSchedulerManager<T>>, services: Arc<ServiceRegistry>) -> Self
    where
        T: Clone + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            run(manager, services, loop_cancel).await;
        });
        Self {
            cancel,
            handle: AsyncMutex::new(Some(handle)),
        }
    }

    /// Signal shutdown and wait for the pump loop to exit.
    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
        }
    }

    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

async fn run<T>(manager: Arc<WorkSchedulerManager<T>>, services: Arc<ServiceRegistry>, shutdown: CancellationToken)
where
    T: Clone + Send + 'static,
{
    loop {
        if shutdown.is_cancelled() {
            return;
        }

        match manager.get_next_task_time() {
            None => {
                manager.wait_for_new_task(&shutdown).await;
                continue;
            }
            Some(next_fire) => {
                let now = chrono::Utc::now();
                if next_fire > now {
                    let sleep_for = (next_fire - now)
                        .to_std()
                        .unwrap_or(std::time::Duration::ZERO);
                    tokio::select! {
                        () = tokio::time::sleep(sleep_for) => {},
                        () = manager.wait_for_new_task(&shutdown) => {},
                    }
                    if shutdown.is_cancelled() {
                        return;
                    }
                    // A newly submitted entry firing before `next_fire`, or
                    // one whose cancellation means it's no longer due, both
                    // require re-checking from the top rather than assuming
                    // everything currently due belongs to this wakeup.
                }
            }
        }

        for id in manager.due_entries() {
            if shutdown.is_cancelled() {
                return;
            }
            let Some((fired, results)) = manager.fire(id) else {
                continue;
            };
            match fired {
                Fired::Direct { mut wrapper, completion } => {
                    let terminal = wrapper
                        .execute((), Arc::clone(&services), &shutdown)
                        .await;
                    if terminal {
                        let outcome = completion
                            .try_get()
                            .expect("execute reporting terminal implies the completion settled");
                        manager.settle_direct(id, outcome, &results);
                    } else {
                        manager.revert_in_flight(id, wrapper, completion);
                    }
                }
                Fired::Enqueued { completion } => {
                    tokio::spawn(async move {
                        let outcome = completion.wait().await;
                        let _ = results.send(outcome).await;
                    });
                }
            }
        }
    }
}
