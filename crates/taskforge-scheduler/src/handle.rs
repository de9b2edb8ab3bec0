//! Caller-facing handles for scheduled work: a lazy sequence of
//! per-occurrence [`Outcome`]s, plus a single-occurrence convenience
//! wrapper for one-shot delayed work (`SPEC_FULL.md` §4.5, Glossary
//! "Recurring handle").

use tokio::sync::mpsc;

use taskforge_core::{CancelOrigin, Outcome};

/// Observes the results of a repeating or cron scheduled entry, one message
/// per occurrence. The channel closes once the series is canceled or its
/// repeat policy is exhausted.
pub struct RecurringHandle<T> {
    receiver: mpsc::Receiver<Outcome<T>>,
}

impl<T> RecurringHandle<T> {
    pub(crate) fn new(receiver: mpsc::Receiver<Outcome<T>>) -> Self {
        Self { receiver }
    }

    /// Wait for the next occurrence's outcome, or `None` once the series is
    /// over.
    pub async fn next(&mut self) -> Option<Outcome<T>> {
        self.receiver.recv().await
    }
}

/// Observes the single outcome of a one-shot delayed entry.
pub struct OnceHandle<T> {
    inner: RecurringHandle<T>,
}

impl<T> OnceHandle<T> {
    pub(crate) fn new(receiver: mpsc::Receiver<Outcome<T>>) -> Self {
        Self {
            inner: RecurringHandle::new(receiver),
        }
    }

    /// Wait for the occurrence's outcome. If the entry was canceled before
    /// it ever fired, this reports `Canceled(Caller)` -- the only way a
    /// one-shot entry's channel closes with nothing sent.
    pub async fn wait(mut self) -> Outcome<T> {
        self.inner
            .next()
            .await
            .unwrap_or(Outcome::Canceled(CancelOrigin::Caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn once_handle_reports_caller_cancel_when_channel_closes_empty() {
        let (tx, rx) = mpsc::channel::<Outcome<u32>>(1);
        drop(tx);
        let handle = OnceHandle::new(rx);
        assert!(matches!(
            handle.wait().await,
            Outcome::Canceled(CancelOrigin::Caller)
        ));
    }

    #[tokio::test]
    async fn once_handle_reports_sent_outcome() {
        let (tx, rx) = mpsc::channel::<Outcome<u32>>(1);
        tx.send(Outcome::Value(7)).await.unwrap();
        drop(tx);
        let handle = OnceHandle::new(rx);
        assert!(matches!(handle.wait().await, Outcome::Value(7)));
    }

    #[tokio::test]
    async fn recurring_handle_yields_none_after_series_ends() {
        let (tx, rx) = mpsc::channel::<Outcome<u32>>(1);
        tx.send(Outcome::Value(1)).await.unwrap();
        drop(tx);
        let mut handle = RecurringHandle::new(rx);
        assert!(matches!(handle.next().await, Some(Outcome::Value(1))));
        assert!(handle.next().await.is_none());
    }
}
