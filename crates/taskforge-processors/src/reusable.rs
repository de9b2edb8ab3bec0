//! `SingleReusable(factory)` and `MultipleReusable(factory, pool_size)`:
//! lazily built, kept-alive-between-tasks arguments, torn down on an idle
//! boundary after `idle_timeout` (`SPEC_FULL.md` §4.3).
//!
//! `Arg` must implement `StartStoppable`; wrap a non-activatable argument in
//! [`crate::inert::Inert`] to opt out of real activation.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Mutex as AsyncMutex;

use taskforge_core::{
    CancellationToken, Result, ServiceRegistry, StartStoppable, TaskSource, TaskforgeError,
};

use crate::traits::{ArgumentFactory, ArgumentProcessor};

struct ReusableSlot<Arg> {
    arg: Arc<Arg>,
    last_used: Instant,
}

/// One lazily built, reused argument instance.
pub struct SingleReusableProcessor<Arg, F> {
    factory: F,
    idle_timeout: Duration,
    slot: AsyncMutex<Option<ReusableSlot<Arg>>>,
}

impl<Arg, F> SingleReusableProcessor<Arg, F>
where
    Arg: StartStoppable + Send + Sync + 'static,
    F: ArgumentFactory<Arg>,
{
    #[must_use]
    pub fn new(factory: F, idle_timeout: Duration) -> Self {
        Self {
            factory,
            idle_timeout,
            slot: AsyncMutex::new(None),
        }
    }

    async fn acquire(&self, cancel: &CancellationToken) -> Result<Arc<Arg>> {
        let mut guard = self.slot.lock().await;
        if let Some(slot) = guard.as_mut() {
            slot.last_used = Instant::now();
            return Ok(Arc::clone(&slot.arg));
        }
        let built = self.factory.build()?;
        built.activate(cancel).await?;
        if !built.is_active() {
            return Err(TaskforgeError::ResourceActivationError {
                reason: "argument reported inactive after activate() succeeded".to_string(),
            });
        }
        let arg = Arc::new(built);
        *guard = Some(ReusableSlot {
            arg: Arc::clone(&arg),
            last_used: Instant::now(),
        });
        Ok(arg)
    }

    async fn teardown_if_idle(&self) {
        let mut guard = self.slot.lock().await;
        if let Some(slot) = guard.as_ref() {
            if slot.last_used.elapsed() >= self.idle_timeout {
                if let Err(err) = slot.arg.deactivate(&CancellationToken::new()).await {
                    tracing::warn!(error = %err, "reusable argument teardown failed");
                }
                *guard = None;
            }
        }
    }
}

#[async_trait::async_trait]
impl<Arg, F, T> ArgumentProcessor<Arc<Arg>, T> for SingleReusableProcessor<Arg, F>
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
            match self.acquire(&cancel).await {
                Ok(arg) => {
                    let terminal = wrapper.execute(arg, Arc::clone(&services), &cancel).await;
                    if !terminal {
                        manager.revert_task(wrapper, meta);
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "reusable argument factory failed; reverting task");
                    manager.revert_task(wrapper, meta);
                }
            }
        }
    }

    async fn on_idle(&self) {
        self.teardown_if_idle().await;
    }
}

/// A fixed-size pool of lazily built, reused argument instances.
pub struct MultipleReusableProcessor<Arg, F> {
    factory: F,
    idle_timeout: Duration,
    slots: Vec<AsyncMutex<Option<ReusableSlot<Arg>>>>,
}

impl<Arg, F> MultipleReusableProcessor<Arg, F>
where
    Arg: StartStoppable + Send + Sync + 'static,
    F: ArgumentFactory<Arg>,
{
    /// `pool_size` must be at least 1.
    pub fn new(factory: F, idle_timeout: Duration, pool_size: usize) -> Result<Self> {
        if pool_size < 1 {
            return Err(TaskforgeError::ConfigurationError {
                reason: "pool_size must be >= 1".to_string(),
            });
        }
        Ok(Self {
            factory,
            idle_timeout,
            slots: (0..pool_size).map(|_| AsyncMutex::new(None)).collect(),
        })
    }

    async fn acquire(&self, idx: usize, cancel: &CancellationToken) -> Result<Arc<Arg>> {
        let mut guard = self.slots[idx].lock().await;
        if let Some(slot) = guard.as_mut() {
            slot.last_used = Instant::now();
            return Ok(Arc::clone(&slot.arg));
        }
        let built = self.factory.build()?;
        built.activate(cancel).await?;
        if !built.is_active() {
            return Err(TaskforgeError::ResourceActivationError {
                reason: "argument reported inactive after activate() succeeded".to_string(),
            });
        }
        let arg = Arc::new(built);
        *guard = Some(ReusableSlot {
            arg: Arc::clone(&arg),
            last_used: Instant::now(),
        });
        Ok(arg)
    }
}

#[async_trait::async_trait]
impl<Arg, F, T> ArgumentProcessor<Arc<Arg>, T> for MultipleReusableProcessor<Arg, F>
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
        let mut free: VecDeque<usize> = (0..self.slots.len()).collect();
        let mut in_flight = FuturesUnordered::new();

        loop {
            while !free.is_empty() && manager.has_task() && !cancel.is_cancelled() {
                let Some((mut wrapper, meta)) = manager.get_task() else {
                    break;
                };
                let idx = free.pop_front().expect("checked non-empty above");
                match self.acquire(idx, &cancel).await {
                    Ok(arg) => {
                        let services = Arc::clone(&services);
                        let cancel = cancel.clone();
                        in_flight.push(Box::pin(async move {
                            let terminal = wrapper.execute(arg, services, &cancel).await;
                            (idx, Some((wrapper, meta)), terminal)
                        })
                            as std::pin::Pin<Box<dyn std::future::Future<Output = _> + Send>>);
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "reusable argument factory failed; reverting task");
                        free.push_back(idx);
                        manager.revert_task(wrapper, meta);
                    }
                }
            }
            if in_flight.is_empty() {
                break;
            }
            if let Some((idx, reverted, terminal)) = in_flight.next().await {
                free.push_back(idx);
                if let Some((wrapper, meta)) = reverted {
                    if !terminal {
                        manager.revert_task(wrapper, meta);
                    }
                }
            }
        }
    }

    async fn on_idle(&self) {
        for slot in &self.slots {
            let mut guard = slot.lock().await;
            if let Some(s) = guard.as_ref() {
                if s.last_used.elapsed() >= self.idle_timeout {
                    if let Err(err) = s.arg.deactivate(&CancellationToken::new()).await {
                        tracing::warn!(error = %err, "reusable argument teardown failed");
                    }
                    *guard = None;
                }
            }
        }
    }
}
