//! `NullArgument`/`SingleNull` and `MultipleNull(maxSimultaneous)`: policies
//! over argument-less work (`SPEC_FULL.md` §4.3).

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use taskforge_core::{CancellationToken, Result, ServiceRegistry, TaskSource, TaskforgeError};

use crate::traits::ArgumentProcessor;

/// One task at a time, no argument.
#[derive(Default)]
pub struct NullArgumentProcessor;

impl NullArgumentProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl<T> ArgumentProcessor<(), T> for NullArgumentProcessor
where
    T: Clone + Send + 'static,
{
    async fn process_pending<S>(
        &self,
        manager: &S,
        services: Arc<ServiceRegistry>,
        cancel: CancellationToken,
    ) where
        S: TaskSource<(), T> + Send + Sync,
    {
        while manager.has_task() && !cancel.is_cancelled() {
            let Some((mut wrapper, meta)) = manager.get_task() else {
                continue;
            };
            let terminal = wrapper.execute((), Arc::clone(&services), &cancel).await;
            if !terminal {
                manager.revert_task(wrapper, meta);
            }
        }
    }
}

/// Up to `max_simultaneous` tasks in flight at once, no argument.
pub struct MultipleNullProcessor {
    max_simultaneous: usize,
}

impl MultipleNullProcessor {
    /// `max_simultaneous` must be at least 1.
    pub fn new(max_simultaneous: usize) -> Result<Self> {
        if max_simultaneous < 1 {
            return Err(TaskforgeError::ConfigurationError {
                reason: "max_simultaneous must be >= 1".to_string(),
            });
        }
        Ok(Self { max_simultaneous })
    }
}

#[async_trait::async_trait]
impl<T> ArgumentProcessor<(), T> for MultipleNullProcessor
where
    T: Clone + Send + 'static,
{
    async fn process_pending<S>(
        &self,
        manager: &S,
        services: Arc<ServiceRegistry>,
        cancel: CancellationToken,
    ) where
        S: TaskSource<(), T> + Send + Sync,
    {
        let mut in_flight = FuturesUnordered::new();
        loop {
            while in_flight.len() < self.max_simultaneous
                && manager.has_task()
                && !cancel.is_cancelled()
            {
                let Some((mut wrapper, meta)) = manager.get_task() else {
                    break;
                };
                let services = Arc::clone(&services);
                let cancel = cancel.clone();
                in_flight.push(async move {
                    let terminal = wrapper.execute((), services, &cancel).await;
                    (wrapper, meta, terminal)
                });
            }
            if in_flight.is_empty() {
                break;
            }
            if let Some((wrapper, meta, terminal)) = in_flight.next().await {
                if !terminal {
                    manager.revert_task(wrapper, meta);
                }
            }
        }
    }
}
