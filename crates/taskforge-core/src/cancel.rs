//! Cancellation tokens.
//!
//! Two independent tokens flow through every execution: the submission's
//! *inner* cancel (owned by the caller) and the worker's *outer* cancel
//! (owned by shutdown). A [`CancellationToken`] is cheap to clone and safe
//! under concurrent cancelers, grounded on the shutdown
//! `AtomicBool` + `Notify` pairing in the teacher's scheduler worker loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Who originated a cancellation, surfaced on a settled [`crate::completion::Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOrigin {
    /// The submission's own inner cancel fired.
    Caller,
    /// The worker's outer (shutdown) cancel fired.
    Shutdown,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cooperative cancellation flag, observable by polling or by awaiting.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Create a fresh, un-canceled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent; wakes every current and future
    /// waiter on [`CancellationToken::cancelled`].
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Non-blocking check.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once this token is canceled. Re-checks the flag after each
    /// wakeup so a `notify_waiters` that races a fresh subscription is never
    /// missed.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Resolve when either `self` or `other` cancels — the "effective
    /// cancellation" composition from the wrapper `Execute` contract.
    pub async fn race(&self, other: &CancellationToken) {
        tokio::select! {
            () = self.cancelled() => {},
            () = other.cancelled() => {},
        }
    }

    /// True once either token has fired.
    #[must_use]
    pub fn either_cancelled(&self, other: &CancellationToken) -> bool {
        self.is_cancelled() || other.is_cancelled()
    }

    /// Build a token that fires once either `a` or `b` fires -- the
    /// "effective cancellation" composition (§5: any-of(inner, outer))
    /// handed to a running async task body, which only ever observes its
    /// own token. Spawns a watcher task, the same pattern as the
    /// pre-emptive settle watcher in `TaskWrapper::new`.
    #[must_use]
    pub fn combined(a: &CancellationToken, b: &CancellationToken) -> CancellationToken {
        let combined = CancellationToken::new();
        let watcher = combined.clone();
        let a = a.clone();
        let b = b.clone();
        tokio::spawn(async move {
            a.race(&b).await;
            watcher.cancel();
        });
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_wakes_waiter() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should be woken")
            .expect("task should not panic");
    }

    #[tokio::test]
    async fn already_canceled_resolves_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(50), token.cancelled())
            .await
            .expect("already-canceled token must not block");
    }

    #[tokio::test]
    async fn race_resolves_on_either() {
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        b.cancel();
        tokio::time::timeout(Duration::from_millis(50), a.race(&b))
            .await
            .expect("race should resolve once one side cancels");
    }

    #[tokio::test]
    async fn combined_fires_when_only_the_second_source_cancels() {
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        let combined = CancellationToken::combined(&a, &b);
        assert!(!combined.is_cancelled());

        b.cancel();
        tokio::time::timeout(Duration::from_millis(50), combined.cancelled())
            .await
            .expect("combined token must fire once either source does");
        assert!(combined.is_cancelled());
    }
}
