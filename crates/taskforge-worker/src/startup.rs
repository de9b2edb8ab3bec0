//! `StartupRegistry`: ordered, fire-once work registration (`SPEC_FULL.md`
//! §6 "Added: startup drain ordering"). Mirrors
//! `openintent-kernel::registry::AdapterRegistry`'s concurrent-registration
//! style, simplified to ordered append -- every registered item runs
//! exactly once, in registration order, and a failing item is logged, not
//! propagated, so it never blocks the items after it.

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;

use taskforge_core::{BoxFuture, Result, ServiceRegistry};

type StartupItem = Box<dyn Fn(Arc<ServiceRegistry>) -> BoxFuture<Result<()>> + Send + Sync>;

/// Accumulates startup-time work and drains it once, in order.
#[derive(Default)]
pub struct StartupRegistry {
    items: AsyncMutex<Vec<StartupItem>>,
}

impl StartupRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: AsyncMutex::new(Vec::new()),
        }
    }

    /// Append `item` to the drain order.
    pub async fn register<F, Fut>(&self, item: F)
    where
        F: Fn(Arc<ServiceRegistry>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.items
            .lock()
            .await
            .push(Box::new(move |services| Box::pin(item(services))));
    }

    /// Run every registered item in order, once. A failing item is logged
    /// at `error!` and does not prevent subsequent items from running.
    pub async fn drain(&self, services: Arc<ServiceRegistry>) {
        let items = std::mem::take(&mut *self.items.lock().await);
        for (index, item) in items.iter().enumerate() {
            if let Err(err) = item(Arc::clone(&services)).await {
                tracing::error!(index, error = %err, "startup work item failed");
            }
        }
    }
}
