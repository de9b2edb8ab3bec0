//! Caller-side completion handles.
//!
//! A [`CompletionHandle`] is settled at most once and the settled value is
//! observable to the caller immediately after settlement, per the wrapper
//! invariant in `SPEC_FULL.md` §3.

use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::cancel::CancelOrigin;
use crate::error::TaskforgeError;

/// The terminal state of one submission.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// The task body returned successfully.
    Value(T),
    /// The task body failed, or attempts were exhausted.
    Failure(String),
    /// The submission was canceled before or during execution.
    Canceled(CancelOrigin),
}

impl<T> Outcome<T> {
    /// True if this outcome is a success.
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Convert into a `Result`, collapsing failure and cancellation into
    /// [`TaskforgeError`].
    pub fn into_result(self) -> Result<T, TaskforgeError> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Failure(reason) => Err(TaskforgeError::task_failure(reason)),
            Self::Canceled(CancelOrigin::Caller) => Err(TaskforgeError::CanceledByCaller),
            Self::Canceled(CancelOrigin::Shutdown) => Err(TaskforgeError::CanceledByShutdown),
        }
    }
}

struct Inner<T> {
    state: Mutex<Option<Outcome<T>>>,
    notify: Notify,
}

/// A cloneable handle observing the terminal state of one task submission.
///
/// `T` must be `Clone` so that [`CompletionHandle::try_get`] can return a
/// snapshot without consuming the single settled value — settlement itself
/// still happens exactly once, enforced by [`CompletionHandle::settle`]'s
/// `bool` return.
pub struct CompletionHandle<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for CompletionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> CompletionHandle<T> {
    /// Create a fresh, pending handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(None),
                notify: Notify::new(),
            }),
        }
    }

    /// Settle this handle. Returns `false` (and does nothing) if it was
    /// already settled — callers must not observe a second settlement.
    pub fn settle(&self, outcome: Outcome<T>) -> bool {
        let mut guard = self.inner.state.lock().expect("completion mutex poisoned");
        if guard.is_some() {
            return false;
        }
        *guard = Some(outcome);
        drop(guard);
        self.inner.notify.notify_waiters();
        true
    }

    /// Non-blocking snapshot of the current state.
    #[must_use]
    pub fn try_get(&self) -> Option<Outcome<T>> {
        self.inner
            .state
            .lock()
            .expect("completion mutex poisoned")
            .clone()
    }

    /// True once settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.inner
            .state
            .lock()
            .expect("completion mutex poisoned")
            .is_some()
    }

    /// Await settlement, returning the terminal outcome.
    pub async fn wait(&self) -> Outcome<T> {
        loop {
            if let Some(outcome) = self.try_get() {
                return outcome;
            }
            let notified = self.inner.notify.notified();
            if let Some(outcome) = self.try_get() {
                return outcome;
            }
            notified.await;
        }
    }
}

impl<T: Clone + Send + 'static> Default for CompletionHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settles_exactly_once() {
        let handle: CompletionHandle<u32> = CompletionHandle::new();
        assert!(handle.settle(Outcome::Value(1)));
        assert!(!handle.settle(Outcome::Value(2)));
        assert!(matches!(handle.try_get(), Some(Outcome::Value(1))));
    }

    #[tokio::test]
    async fn wait_observes_settlement_immediately() {
        let handle: CompletionHandle<u32> = CompletionHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        handle.settle(Outcome::Value(42));

        let outcome = task.await.unwrap();
        assert!(matches!(outcome, Outcome::Value(42)));
    }

    #[test]
    fn into_result_maps_variants() {
        assert!(Outcome::<u32>::Value(1).into_result().is_ok());
        assert!(Outcome::<u32>::Failure("x".into()).into_result().is_err());
        assert!(
            Outcome::<u32>::Canceled(CancelOrigin::Caller)
                .into_result()
                .is_err()
        );
    }
}
