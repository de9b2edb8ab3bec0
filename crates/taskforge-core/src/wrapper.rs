//! Task wrappers: per-submission mutable state layered on a [`TaskKind`].
//!
//! Implements the `Execute` contract from `SPEC_FULL.md` §4.1 verbatim,
//! including the attempt-credit-back rule for outer-cancel-without-inner and
//! the pre-emptive cancel registration.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::cancel::{CancelOrigin, CancellationToken};
use crate::completion::{CompletionHandle, Outcome};
use crate::error::TaskforgeError;
use crate::registry::ServiceRegistry;
use crate::task_value::TaskKind;

enum ExecOutcome<T> {
    Ok(T),
    Err(TaskforgeError),
    Canceled,
}

/// One submission: a shared [`TaskKind`] plus its mutable attempt/cancel/
/// completion state.
pub struct TaskWrapper<Arg, T> {
    task: TaskKind<Arg, T>,
    attempts_remaining: u32,
    inner_cancel: CancellationToken,
    completion: CompletionHandle<T>,
    registration: Option<JoinHandle<()>>,
    shutdown_grace_used: bool,
}

impl<Arg, T> TaskWrapper<Arg, T>
where
    Arg: Send + 'static,
    T: Clone + Send + 'static,
{
    /// Create a wrapper for `task`, clamping `attempts` to at least 1, and
    /// spawn the inner-cancel watcher that pre-emptively settles the
    /// completion handle canceled even if no execution is ever attempted.
    #[must_use]
    pub fn new(
        task: TaskKind<Arg, T>,
        attempts: u32,
        inner_cancel: CancellationToken,
    ) -> (Self, CompletionHandle<T>) {
        let completion = CompletionHandle::new();
        let watch_cancel = inner_cancel.clone();
        let watch_completion = completion.clone();
        let registration = tokio::spawn(async move {
            watch_cancel.cancelled().await;
            watch_completion.settle(Outcome::Canceled(CancelOrigin::Caller));
        });

        let wrapper = Self {
            task,
            attempts_remaining: attempts.max(1),
            inner_cancel,
            completion: completion.clone(),
            registration: Some(registration),
            shutdown_grace_used: false,
        };
        (wrapper, completion)
    }

    /// Remaining attempts, for diagnostics and tests.
    #[must_use]
    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    /// The submission's own (inner) cancellation token.
    #[must_use]
    pub fn inner_cancel(&self) -> &CancellationToken {
        &self.inner_cancel
    }

    /// Run one attempt. Returns `true` if the wrapper reached a terminal
    /// state (caller must drop it); `false` means the caller should
    /// re-enqueue (`RevertTask`) for a later attempt.
    pub async fn execute(
        &mut self,
        arg: Arg,
        services: Arc<ServiceRegistry>,
        outer_cancel: &CancellationToken,
    ) -> bool {
        if self.attempts_remaining == 0 {
            self.settle(Outcome::Failure("no attempts left".to_string()));
            self.release_registration();
            return true;
        }

        self.attempts_remaining -= 1;

        if self.inner_cancel.either_cancelled(outer_cancel) {
            return self.finish_cancellation(outer_cancel);
        }

        let exec_outcome = match &self.task {
            TaskKind::Sync(body) => match body(arg, &services) {
                Ok(value) => ExecOutcome::Ok(value),
                Err(err) if err.is_canceled() => ExecOutcome::Canceled,
                Err(err) => ExecOutcome::Err(err),
            },
            TaskKind::Async(body) => {
                // The body only ever observes the token it's handed, so it
                // must be the any-of(inner, outer) composition, not just
                // the caller's own inner cancel -- a cooperative body has
                // to be able to see shutdown too.
                let effective_cancel = CancellationToken::combined(&self.inner_cancel, outer_cancel);
                let future = body(arg, Arc::clone(&services), effective_cancel.clone());
                tokio::select! {
                    result = future => match result {
                        Ok(value) => ExecOutcome::Ok(value),
                        Err(err) if err.is_canceled() => ExecOutcome::Canceled,
                        Err(err) => ExecOutcome::Err(err),
                    },
                    () = effective_cancel.cancelled() => ExecOutcome::Canceled,
                }
            }
        };

        match exec_outcome {
            ExecOutcome::Ok(value) => {
                self.settle(Outcome::Value(value));
                self.release_registration();
                true
            }
            ExecOutcome::Canceled => self.finish_cancellation(outer_cancel),
            ExecOutcome::Err(err) => {
                tracing::error!(error = %err, "task execution failed");
                if self.attempts_remaining > 0 {
                    false
                } else {
                    self.settle(Outcome::Failure(err.to_string()));
                    self.release_registration();
                    true
                }
            }
        }
    }

    fn finish_cancellation(&mut self, outer_cancel: &CancellationToken) -> bool {
        let inner_fired = self.inner_cancel.is_cancelled();
        let outer_fired = outer_cancel.is_cancelled();

        // The credit-back grace is a one-time allowance: the first time
        // shutdown (not the caller) aborts an in-flight attempt, it's given
        // back so a future retry isn't unfairly charged for it. If shutdown
        // is still in effect on a later call, the grace has already been
        // spent and this settles for good -- otherwise a wrapper whose
        // attempts started at 1 could never leave the non-terminal state.
        if outer_fired && !inner_fired && !self.shutdown_grace_used {
            self.attempts_remaining += 1;
            self.shutdown_grace_used = true;
            tracing::warn!("execution aborted by shutdown; attempt credited back");
            return false;
        }

        let origin = if inner_fired {
            CancelOrigin::Caller
        } else {
            CancelOrigin::Shutdown
        };
        self.settle(Outcome::Canceled(origin));
        self.release_registration();
        true
    }

    /// Settle a wrapper that is never going to be handed another attempt --
    /// e.g. one left sitting in a manager when its worker pump stops. Unlike
    /// [`Self::finish_cancellation`] this does not consult the credit-back
    /// grace: the wrapper isn't mid-execution, it's simply abandoned, so it
    /// always settles `Canceled(Shutdown)`.
    pub fn abandon(mut self) {
        self.settle(Outcome::Canceled(CancelOrigin::Shutdown));
        self.release_registration();
    }

    fn settle(&self, outcome: Outcome<T>) {
        self.completion.settle(outcome);
    }

    fn release_registration(&mut self) {
        if let Some(handle) = self.registration.take() {
            handle.abort();
        }
    }
}

impl<Arg, T> Drop for TaskWrapper<Arg, T> {
    fn drop(&mut self) {
        if let Some(handle) = self.registration.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServiceRegistry;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn services() -> Arc<ServiceRegistry> {
        Arc::new(ServiceRegistry::new())
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let task: TaskKind<(), u32> = TaskKind::sync(|(), _services| Ok(7));
        let (mut wrapper, completion) = TaskWrapper::new(task, 1, CancellationToken::new());

        let terminal = wrapper.execute((), services(), &CancellationToken::new()).await;
        assert!(terminal);
        assert!(matches!(completion.try_get(), Some(Outcome::Value(7))));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let attempt = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempt);
        let task: TaskKind<(), u32> = TaskKind::sync(move |(), _services| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(TaskforgeError::task_failure("transient"))
            } else {
                Ok(99)
            }
        });
        let (mut wrapper, completion) = TaskWrapper::new(task, 2, CancellationToken::new());
        let outer = CancellationToken::new();

        let terminal = wrapper.execute((), services(), &outer).await;
        assert!(!terminal);
        assert!(!completion.is_settled());

        let terminal = wrapper.execute((), services(), &outer).await;
        assert!(terminal);
        assert!(matches!(completion.try_get(), Some(Outcome::Value(99))));
    }

    #[tokio::test]
    async fn exhausts_attempts_and_fails() {
        let task: TaskKind<(), u32> =
            TaskKind::sync(|(), _services| Err(TaskforgeError::task_failure("boom")));
        let (mut wrapper, completion) = TaskWrapper::new(task, 1, CancellationToken::new());
        let terminal = wrapper.execute((), services(), &CancellationToken::new()).await;
        assert!(terminal);
        assert!(matches!(completion.try_get(), Some(Outcome::Failure(_))));
    }

    #[tokio::test]
    async fn inner_cancel_settles_without_executing() {
        let ran = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ran);
        let inner = CancellationToken::new();
        inner.cancel();
        let task: TaskKind<(), u32> = TaskKind::sync(move |(), _services| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        });
        let (mut wrapper, completion) = TaskWrapper::new(task, 3, inner);

        let terminal = wrapper.execute((), services(), &CancellationToken::new()).await;
        assert!(terminal);
        assert!(matches!(
            completion.try_get(),
            Some(Outcome::Canceled(CancelOrigin::Caller))
        ));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn outer_cancel_mid_flight_credits_attempt_back() {
        // An async task that blocks forever; the wrapper's `execute` races
        // it against the already-fired outer cancel and must abort it.
        let task: TaskKind<(), u32> = TaskKind::asynchronous(|(), _services, _cancel| async {
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
            Ok(1)
        });
        let (mut wrapper, completion) = TaskWrapper::new(task, 2, CancellationToken::new());
        assert_eq!(wrapper.attempts_remaining(), 2);

        let outer = CancellationToken::new();
        outer.cancel();
        let terminal = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            wrapper.execute((), services(), &outer),
        )
        .await
        .expect("execute must not hang past the cancellation race");
        // outer fired, inner not fired: the consumed attempt is credited
        // back, so attempts_remaining returns to 2 and the task is not
        // terminal (caller should revert & retry).
        assert!(!terminal);
        assert_eq!(wrapper.attempts_remaining(), 2);
        assert!(!completion.is_settled());
    }

    #[tokio::test]
    async fn async_body_receives_a_token_that_observes_shutdown() {
        // The body only ever sees the token it's handed -- it must be the
        // any-of(inner, outer) composition, not just the caller's own
        // inner cancel, or a cooperative body could never notice shutdown.
        use std::sync::Mutex as StdMutex;

        let captured: Arc<StdMutex<Option<CancellationToken>>> = Arc::new(StdMutex::new(None));
        let captured_for_body = Arc::clone(&captured);
        let task: TaskKind<(), u32> = TaskKind::asynchronous(move |(), _services, cancel| {
            let captured = Arc::clone(&captured_for_body);
            async move {
                *captured.lock().unwrap() = Some(cancel.clone());
                cancel.cancelled().await;
                Ok(1)
            }
        });
        let (mut wrapper, _completion) = TaskWrapper::new(task, 1, CancellationToken::new());

        let outer = CancellationToken::new();
        let outer_for_exec = outer.clone();
        let exec = tokio::spawn(async move { wrapper.execute((), services(), &outer_for_exec).await });

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        outer.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), exec)
            .await
            .expect("execute must not hang")
            .expect("execute task must not panic");

        let token = captured
            .lock()
            .unwrap()
            .clone()
            .expect("body must have run and captured its token");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn abandon_settles_canceled_by_shutdown_without_consulting_attempts() {
        let task: TaskKind<(), u32> = TaskKind::sync(|(), _services| Ok(1));
        let (wrapper, completion) = TaskWrapper::new(task, 3, CancellationToken::new());

        wrapper.abandon();

        assert!(matches!(
            completion.try_get(),
            Some(Outcome::Canceled(CancelOrigin::Shutdown))
        ));
    }

    #[tokio::test]
    async fn outer_cancel_with_no_attempts_left_settles_canceled() {
        let outer = CancellationToken::new();
        outer.cancel();
        let task: TaskKind<(), u32> = TaskKind::sync(|(), _services| Ok(1));
        let (mut wrapper, completion) = TaskWrapper::new(task, 1, CancellationToken::new());

        let terminal = wrapper.execute((), services(), &outer).await;
        assert!(!terminal); // first pass credits back the only attempt
        let terminal2 = wrapper.execute((), services(), &outer).await;
        assert!(terminal2);
        assert!(matches!(
            completion.try_get(),
            Some(Outcome::Canceled(CancelOrigin::Shutdown))
        ));
    }
}
