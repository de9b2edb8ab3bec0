//! `WorkSchedulerManager`: the time-indexed collection backing delayed,
//! fixed-interval, and cron work, grounded on
//! `openintent-intent::scheduler::CronScheduler` -- a full rescan of every
//! entry on each tick, deliberately preferred over a binary-heap time index
//! to avoid stale-entry bugs and because it's the directly observed teacher
//! pattern (`SPEC_FULL.md` §9).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::sync::mpsc;
use uuid::Uuid;

use taskforge_core::{CancellationToken, CompletionHandle, Outcome, TaskKind, TaskWrapper};

use crate::handle::{OnceHandle, RecurringHandle};
use crate::repeat::RepeatPolicy;
use crate::target::EnqueueTarget;

/// Wire-shaped snapshot of one scheduled entry, for diagnostics/introspection
/// -- not consumed by the engine itself, mirroring the teacher's
/// `ScheduledJobInfo`-style status structs kept separate from live state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJobInfo {
    pub id: Uuid,
    pub next_fire: DateTime<Utc>,
    /// Remaining occurrences, `None` for an unbounded repeat.
    pub remaining: Option<u32>,
}

/// How a fired occurrence is dispatched.
pub(crate) enum Payload<T> {
    /// Executed inline by the scheduler's own pump.
    Direct,
    /// Forwarded into a work queue; the scheduler's job ends at enqueue.
    Queued(Arc<dyn EnqueueTarget<T>>),
}

struct ScheduledEntry<T> {
    task: TaskKind<(), T>,
    attempts_per_occurrence: u32,
    repeat: RepeatPolicy,
    cancel: CancellationToken,
    remaining: Option<u32>,
    next_fire: DateTime<Utc>,
    payload: Payload<T>,
    results: mpsc::Sender<Outcome<T>>,
    order: u64,
    /// A `Direct` occurrence currently mid-retry: reverted here (not
    /// re-queued elsewhere) so the next due-scan picks up the same wrapper
    /// instead of starting a fresh one, preserving `attempts_remaining`.
    in_flight: Option<(TaskWrapper<(), T>, CompletionHandle<T>)>,
}

/// What firing a due entry produced; the caller (the scheduler pump) still
/// has to run it.
pub(crate) enum Fired<T> {
    Direct {
        wrapper: TaskWrapper<(), T>,
        completion: CompletionHandle<T>,
    },
    Enqueued {
        completion: CompletionHandle<T>,
    },
}

fn advance<T>(entry: &mut ScheduledEntry<T>) -> bool {
    let remaining_after = entry.remaining.map(|r| r.saturating_sub(1));
    if remaining_after == Some(0) {
        return true;
    }
    match entry.repeat.advance(entry.next_fire) {
        Some(next_fire) => {
            entry.next_fire = next_fire;
            entry.remaining = remaining_after;
            false
        }
        None => true,
    }
}

/// The time-indexed collection of scheduled work.
pub struct WorkSchedulerManager<T> {
    entries: DashMap<Uuid, ScheduledEntry<T>>,
    notify: Notify,
    sequence: AtomicU64,
}

impl<T> Default for WorkSchedulerManager<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkSchedulerManager<T>
where
    T: Clone + Send + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            notify: Notify::new(),
            sequence: AtomicU64::new(0),
        }
    }

    fn insert(
        &self,
        task: TaskKind<(), T>,
        attempts: u32,
        repeat: RepeatPolicy,
        next_fire: DateTime<Utc>,
        cancel: CancellationToken,
        remaining: Option<u32>,
        payload: Payload<T>,
        channel_capacity: usize,
    ) -> mpsc::Receiver<Outcome<T>> {
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let id = Uuid::now_v7();
        let order = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(
            id,
            ScheduledEntry {
                task,
                attempts_per_occurrence: attempts.max(1),
                repeat,
                cancel,
                remaining,
                next_fire,
                payload,
                results: tx,
                order,
                in_flight: None,
            },
        );
        self.notify.notify_one();
        rx
    }

    /// Schedule `task` to run once, directly, at `fire_at`.
    pub fn add_scheduled_work(
        &self,
        task: TaskKind<(), T>,
        attempts: u32,
        fire_at: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> OnceHandle<T> {
        let rx = self.insert(
            task,
            attempts,
            RepeatPolicy::Once,
            fire_at,
            cancel,
            Some(1),
            Payload::Direct,
            1,
        );
        OnceHandle::new(rx)
    }

    /// Schedule `task` to run once, forwarded into `target` at `fire_at`.
    pub fn add_scheduled_work_queued(
        &self,
        task: TaskKind<(), T>,
        attempts: u32,
        fire_at: DateTime<Utc>,
        cancel: CancellationToken,
        target: Arc<dyn EnqueueTarget<T>>,
    ) -> OnceHandle<T> {
        let rx = self.insert(
            task,
            attempts,
            RepeatPolicy::Once,
            fire_at,
            cancel,
            Some(1),
            Payload::Queued(target),
            1,
        );
        OnceHandle::new(rx)
    }

    /// Schedule `task` to run directly every `step`, starting at `start`,
    /// for up to `count` occurrences (`None` = unbounded).
    pub fn add_repeated_work(
        &self,
        task: TaskKind<(), T>,
        attempts: u32,
        start: DateTime<Utc>,
        step: std::time::Duration,
        count: Option<u32>,
        cancel: CancellationToken,
    ) -> RecurringHandle<T> {
        let capacity = count.map(|c| c as usize).unwrap_or(16);
        let rx = self.insert(
            task,
            attempts,
            RepeatPolicy::FixedInterval { step },
            start,
            cancel,
            count,
            Payload::Direct,
            capacity,
        );
        RecurringHandle::new(rx)
    }

    /// Queued counterpart of [`Self::add_repeated_work`].
    pub fn add_repeated_work_queued(
        &self,
        task: TaskKind<(), T>,
        attempts: u32,
        start: DateTime<Utc>,
        step: std::time::Duration,
        count: Option<u32>,
        cancel: CancellationToken,
        target: Arc<dyn EnqueueTarget<T>>,
    ) -> RecurringHandle<T> {
        let capacity = count.map(|c| c as usize).unwrap_or(16);
        let rx = self.insert(
            task,
            attempts,
            RepeatPolicy::FixedInterval { step },
            start,
            cancel,
            count,
            Payload::Queued(target),
            capacity,
        );
        RecurringHandle::new(rx)
    }

    /// Schedule `task` on a cron expression (5, 6, or 7 fields), for up to
    /// `count` occurrences.
    pub fn add_cron_work(
        &self,
        task: TaskKind<(), T>,
        attempts: u32,
        cron_expr: &str,
        count: Option<u32>,
        cancel: CancellationToken,
    ) -> taskforge_core::Result<RecurringHandle<T>> {
        let schedule = crate::repeat::parse_schedule(cron_expr)?;
        let first = schedule.after(&Utc::now()).next().ok_or_else(|| {
            taskforge_core::TaskforgeError::ConfigurationError {
                reason: format!("cron expression `{cron_expr}` has no future occurrence"),
            }
        })?;
        let capacity = count.map(|c| c as usize).unwrap_or(16);
        let rx = self.insert(
            task,
            attempts,
            RepeatPolicy::Cron { schedule },
            first,
            cancel,
            count,
            Payload::Direct,
            capacity,
        );
        Ok(RecurringHandle::new(rx))
    }

    /// Queued counterpart of [`Self::add_cron_work`].
    pub fn add_cron_work_queued(
        &self,
        task: TaskKind<(), T>,
        attempts: u32,
        cron_expr: &str,
        count: Option<u32>,
        cancel: CancellationToken,
        target: Arc<dyn EnqueueTarget<T>>,
    ) -> taskforge_core::Result<RecurringHandle<T>> {
        let schedule = crate::repeat::parse_schedule(cron_expr)?;
        let first = schedule.after(&Utc::now()).next().ok_or_else(|| {
            taskforge_core::TaskforgeError::ConfigurationError {
                reason: format!("cron expression `{cron_expr}` has no future occurrence"),
            }
        })?;
        let capacity = count.map(|c| c as usize).unwrap_or(16);
        let rx = self.insert(
            task,
            attempts,
            RepeatPolicy::Cron { schedule },
            first,
            cancel,
            count,
            Payload::Queued(target),
            capacity,
        );
        Ok(RecurringHandle::new(rx))
    }

    /// The earliest `next_fire` across all live entries, or `None` if empty.
    #[must_use]
    pub fn get_next_task_time(&self) -> Option<DateTime<Utc>> {
        self.entries.iter().map(|e| e.next_fire).min()
    }

    /// Entries due at or before now, ordered by fire time then insertion
    /// order (earlier submissions win ties).
    pub(crate) fn due_entries(&self) -> Vec<Uuid> {
        let now = Utc::now();
        let mut due: Vec<(DateTime<Utc>, u64, Uuid)> = self
            .entries
            .iter()
            .filter(|e| e.next_fire <= now)
            .map(|e| (e.next_fire, e.order, *e.key()))
            .collect();
        due.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        due.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Snapshot of upcoming fire times, for diagnostics/introspection.
    #[must_use]
    pub fn get_upcoming_tasks(&self) -> Vec<DateTime<Utc>> {
        let mut times: Vec<_> = self.entries.iter().map(|e| e.next_fire).collect();
        times.sort();
        times
    }

    /// Wire-shaped snapshot of every live entry, sorted by fire time.
    #[must_use]
    pub fn list_jobs(&self) -> Vec<ScheduledJobInfo> {
        let mut jobs: Vec<_> = self
            .entries
            .iter()
            .map(|e| ScheduledJobInfo {
                id: *e.key(),
                next_fire: e.next_fire,
                remaining: e.remaining,
            })
            .collect();
        jobs.sort_by_key(|j| j.next_fire);
        jobs
    }

    /// Sleep until either a new (possibly earlier-firing) entry is
    /// submitted or `cancel` fires. Always returns immediately if there are
    /// no entries and no wake is pending -- the caller re-checks
    /// `get_next_task_time` in a loop.
    pub async fn wait_for_new_task(&self, cancel: &CancellationToken) {
        tokio::select! {
            () = self.notify.notified() => {},
            () = cancel.cancelled() => {},
        }
    }

    /// Fire one due entry: build (or resume) its wrapper/enqueue call. For
    /// `Queued` payloads the entry is advanced/removed immediately, since
    /// the scheduler's responsibility ends at enqueue; for `Direct`
    /// payloads advancement happens later, in [`Self::settle_direct`], once
    /// the wrapper actually reaches a terminal state.
    pub(crate) fn fire(&self, id: Uuid) -> Option<(Fired<T>, mpsc::Sender<Outcome<T>>)> {
        let mut entry = self.entries.get_mut(&id)?;
        if entry.cancel.is_cancelled() {
            drop(entry);
            self.entries.remove(&id);
            return None;
        }

        let results = entry.results.clone();
        let queued_target = match &entry.payload {
            Payload::Direct => None,
            Payload::Queued(target) => Some(Arc::clone(target)),
        };

        let (fired, exhausted) = match queued_target {
            None => {
                let (wrapper, completion) = entry.in_flight.take().unwrap_or_else(|| {
                    TaskWrapper::new(
                        entry.task.clone(),
                        entry.attempts_per_occurrence,
                        entry.cancel.clone(),
                    )
                });
                (Fired::Direct { wrapper, completion }, false)
            }
            Some(target) => {
                let completion = target.enqueue(
                    entry.task.clone(),
                    entry.attempts_per_occurrence,
                    entry.cancel.clone(),
                );
                let exhausted = advance(&mut *entry);
                (Fired::Enqueued { completion }, exhausted)
            }
        };
        drop(entry);
        if exhausted {
            self.entries.remove(&id);
        }
        Some((fired, results))
    }

    /// Put a non-terminal `Direct` wrapper back for the next due-scan to
    /// resume (`RevertWork` under the current, unchanged `next_fire`).
    pub(crate) fn revert_in_flight(
        &self,
        id: Uuid,
        wrapper: TaskWrapper<(), T>,
        completion: CompletionHandle<T>,
    ) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.in_flight = Some((wrapper, completion));
        }
    }

    /// Record a `Direct` occurrence's terminal outcome, forward it to the
    /// caller's handle, and advance (or remove) the entry.
    pub(crate) fn settle_direct(&self, id: Uuid, outcome: Outcome<T>, results: &mpsc::Sender<Outcome<T>>) {
        if results.try_send(outcome).is_err() {
            tracing::warn!(%id, "scheduled results channel full or closed; occurrence dropped");
        }
        let exhausted = match self.entries.get_mut(&id) {
            Some(mut entry) => advance(&mut *entry),
            None => return,
        };
        if exhausted {
            self.entries.remove(&id);
        }
    }
}
