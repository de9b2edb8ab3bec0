//! The Producer API (`SPEC_FULL.md` §6): thin, typed pipeline handles over
//! a manager + processor + worker, plus a `Host` aggregating the
//! cross-cutting concerns -- the shared [`ServiceRegistry`], the
//! [`StartupRegistry`], and coordinated shutdown of every pipeline it was
//! told about.
//!
//! Each pipeline type (`WorkQueue`, `PriorityWorkQueue`, `AccessQueue`,
//! `Conveyor`, `PriorityConveyor`, `Scheduler`) is generic over its own
//! `Arg`/`T`; a single non-generic `Host` can't own an unbounded set of
//! differently-typed queues without falling back to the reflection-based
//! dispatch this engine specifically avoids (`SPEC_FULL.md` §2, "typed
//! registry replacing reflection"), so the producer API's per-kind methods
//! live on the pipeline handles and `Host` owns only what's common to all
//! of them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use taskforge_core::{
    Access, CancellationToken, CompletionHandle, ConveyorMachine, Outcome, Result, ServiceRegistry,
    TaskKind, Work,
};
use taskforge_processors::ArgumentProcessor;
use taskforge_queues::{
    AccessQueueManager, ConveyorManager, PriorityConveyorManager, PriorityQueueManager,
    SimpleQueueManager,
};
use taskforge_scheduler::{EnqueueTarget, OnceHandle, RecurringHandle, SchedulerPump, WorkSchedulerManager};
use taskforge_worker::{StartupRegistry, TaskWorker};

/// Anything `Host::shutdown` can stop: a running worker pump or scheduler
/// pump.
#[async_trait]
trait Stoppable: Send + Sync {
    async fn stop(&self);
}

#[async_trait]
impl Stoppable for TaskWorker {
    async fn stop(&self) {
        TaskWorker::stop(self).await;
    }
}

#[async_trait]
impl Stoppable for SchedulerPump {
    async fn stop(&self) {
        SchedulerPump::stop(self).await;
    }
}

/// Owns the shared services, the startup-work registry, and every pipeline
/// registered with it, so the whole engine can be started and torn down
/// from one place.
#[derive(Default)]
pub struct Host {
    services: Arc<ServiceRegistry>,
    startup: StartupRegistry,
    stoppables: AsyncMutex<Vec<Arc<dyn Stoppable>>>,
}

impl Host {
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: Arc::new(ServiceRegistry::new()),
            startup: StartupRegistry::new(),
            stoppables: AsyncMutex::new(Vec::new()),
        }
    }

    /// The shared service registry every pipeline's tasks execute against.
    #[must_use]
    pub fn services(&self) -> Arc<ServiceRegistry> {
        Arc::clone(&self.services)
    }

    /// Append work that runs once, in registration order, before the host
    /// is considered ready.
    pub async fn register_startup_work<F, Fut>(&self, item: F)
    where
        F: Fn(Arc<ServiceRegistry>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.startup.register(item).await;
    }

    /// Run every registered startup item, once.
    pub async fn run_startup_work(&self) {
        self.startup.drain(self.services()).await;
    }

    async fn track(&self, stoppable: Arc<dyn Stoppable>) {
        self.stoppables.lock().await.push(stoppable);
    }

    /// Stop every tracked pipeline's worker/scheduler pump. Idempotent.
    pub async fn shutdown(&self) {
        for stoppable in self.stoppables.lock().await.iter() {
            stoppable.stop().await;
        }
    }

    /// Start a single-lane work queue pipeline, tracked for `shutdown`.
    pub async fn work_queue<P, T>(&self, processor: Arc<P>) -> WorkQueue<T>
    where
        P: ArgumentProcessor<(), T> + Send + Sync + 'static,
        T: Clone + Send + 'static,
    {
        let manager = Arc::new(SimpleQueueManager::new());
        let worker = Arc::new(TaskWorker::start(
            Arc::clone(&manager),
            processor,
            self.services(),
        ));
        self.track(Arc::clone(&worker) as Arc<dyn Stoppable>).await;
        WorkQueue { manager, worker }
    }

    /// Start a priority-partitioned work queue pipeline, tracked for
    /// `shutdown`.
    pub async fn priority_work_queue<P, T>(&self, max_priority: u8, processor: Arc<P>) -> PriorityWorkQueue<T>
    where
        P: ArgumentProcessor<(), T> + Send + Sync + 'static,
        T: Clone + Send + 'static,
    {
        let manager = Arc::new(PriorityQueueManager::new(max_priority));
        let worker = Arc::new(TaskWorker::start(
            Arc::clone(&manager),
            processor,
            self.services(),
        ));
        self.track(Arc::clone(&worker) as Arc<dyn Stoppable>).await;
        PriorityWorkQueue { manager, worker }
    }

    /// Start an access queue pipeline serializing work against a shared
    /// resource `R`, tracked for `shutdown`.
    pub async fn access_queue<P, R, T>(
        &self,
        max_attempts: u32,
        processor: Arc<P>,
    ) -> Result<AccessQueue<R, T>>
    where
        P: ArgumentProcessor<R, T> + Send + Sync + 'static,
        R: Send + 'static,
        T: Clone + Send + 'static,
    {
        let manager = Arc::new(AccessQueueManager::new(max_attempts)?);
        let worker = Arc::new(TaskWorker::start(
            Arc::clone(&manager),
            processor,
            self.services(),
        ));
        self.track(Arc::clone(&worker) as Arc<dyn Stoppable>).await;
        Ok(AccessQueue { manager, worker })
    }

    /// Start a single-lane conveyor pipeline over a pooled
    /// [`ConveyorMachine`] argument, tracked for `shutdown`.
    pub async fn conveyor<P, D, R>(&self, processor: Arc<P>) -> Conveyor<D, R>
    where
        P: ArgumentProcessor<Arc<dyn ConveyorMachine<D, R>>, R> + Send + Sync + 'static,
        D: Send + 'static,
        R: Clone + Send + 'static,
    {
        let manager: Arc<ConveyorManager<D, R>> = Arc::new(SimpleQueueManager::new());
        let worker = Arc::new(TaskWorker::start(
            Arc::clone(&manager),
            processor,
            self.services(),
        ));
        self.track(Arc::clone(&worker) as Arc<dyn Stoppable>).await;
        Conveyor { manager, worker }
    }

    /// Start a priority-partitioned conveyor pipeline, tracked for
    /// `shutdown`.
    pub async fn priority_conveyor<P, D, R>(&self, max_priority: u8, processor: Arc<P>) -> PriorityConveyor<D, R>
    where
        P: ArgumentProcessor<Arc<dyn ConveyorMachine<D, R>>, R> + Send + Sync + 'static,
        D: Send + 'static,
        R: Clone + Send + 'static,
    {
        let manager: Arc<PriorityConveyorManager<D, R>> = Arc::new(PriorityQueueManager::new(max_priority));
        let worker = Arc::new(TaskWorker::start(
            Arc::clone(&manager),
            processor,
            self.services(),
        ));
        self.track(Arc::clone(&worker) as Arc<dyn Stoppable>).await;
        PriorityConveyor { manager, worker }
    }

    /// Start the time-based scheduler pipeline, tracked for `shutdown`.
    pub async fn scheduler<T>(&self) -> Scheduler<T>
    where
        T: Clone + Send + 'static,
    {
        let manager = Arc::new(WorkSchedulerManager::new());
        let pump = Arc::new(SchedulerPump::start(Arc::clone(&manager), self.services()));
        self.track(Arc::clone(&pump) as Arc<dyn Stoppable>).await;
        Scheduler { manager, pump }
    }
}

/// Producer handle for a single-lane work queue.
pub struct WorkQueue<T> {
    manager: Arc<SimpleQueueManager<(), T>>,
    worker: Arc<TaskWorker>,
}

impl<T: Clone + Send + 'static> WorkQueue<T> {
    /// Submit argument-less work.
    pub fn enqueue_work(&self, task: Work<T>, attempts: u32, cancel: CancellationToken) -> CompletionHandle<T> {
        self.manager.submit(task, attempts, cancel)
    }

    #[must_use]
    pub fn worker(&self) -> &TaskWorker {
        &self.worker
    }
}

/// Producer handle for a priority-partitioned work queue.
pub struct PriorityWorkQueue<T> {
    manager: Arc<PriorityQueueManager<(), T>>,
    worker: Arc<TaskWorker>,
}

impl<T: Clone + Send + 'static> PriorityWorkQueue<T> {
    /// Submit argument-less work at `priority`.
    pub fn enqueue_work(
        &self,
        task: Work<T>,
        attempts: u32,
        priority: u8,
        cancel: CancellationToken,
    ) -> Result<CompletionHandle<T>> {
        self.manager.submit(task, attempts, priority, cancel)
    }

    #[must_use]
    pub fn worker(&self) -> &TaskWorker {
        &self.worker
    }
}

/// Producer handle for an access queue over a shared resource `R`.
pub struct AccessQueue<R, T> {
    manager: Arc<AccessQueueManager<R, T>>,
    worker: Arc<TaskWorker>,
}

impl<R: Send + 'static, T: Clone + Send + 'static> AccessQueue<R, T> {
    /// Submit work against the serialized shared resource.
    pub fn enqueue_access(
        &self,
        task: Access<R, T>,
        attempts: u32,
        cancel: CancellationToken,
    ) -> CompletionHandle<T> {
        self.manager.submit(task, attempts, cancel)
    }

    #[must_use]
    pub fn worker(&self) -> &TaskWorker {
        &self.worker
    }
}

fn conveyor_task<D, R>(data: D) -> TaskKind<Arc<dyn ConveyorMachine<D, R>>, R>
where
    D: Clone + Send + 'static,
    R: Send + 'static,
{
    TaskKind::asynchronous(move |machine, _services, cancel| {
        let data = data.clone();
        async move {
            let attempts = machine.max_attempts();
            machine.process(data, attempts, cancel).await
        }
    })
}

/// Producer handle for a single-lane conveyor (data pipeline stage pool).
pub struct Conveyor<D, R> {
    manager: Arc<ConveyorManager<D, R>>,
    worker: Arc<TaskWorker>,
}

impl<D, R> Conveyor<D, R>
where
    D: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    /// Process one data item through the pooled conveyor machine.
    pub fn process_data(&self, data: D, attempts: u32, cancel: CancellationToken) -> CompletionHandle<R> {
        self.manager.submit(conveyor_task(data), attempts, cancel)
    }

    /// Process a batch, preserving input order in the returned outcomes --
    /// every item is submitted up front so the pool processes them
    /// concurrently, then results are collected back in submission order.
    pub async fn process_batch(
        &self,
        items: Vec<D>,
        attempts: u32,
        cancel: CancellationToken,
    ) -> Vec<Outcome<R>> {
        let handles: Vec<_> = items
            .into_iter()
            .map(|data| self.process_data(data, attempts, cancel.clone()))
            .collect();
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.wait().await);
        }
        results
    }

    #[must_use]
    pub fn worker(&self) -> &TaskWorker {
        &self.worker
    }
}

/// Producer handle for a priority-partitioned conveyor.
pub struct PriorityConveyor<D, R> {
    manager: Arc<PriorityConveyorManager<D, R>>,
    worker: Arc<TaskWorker>,
}

impl<D, R> PriorityConveyor<D, R>
where
    D: Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    /// Process one data item at `priority`.
    pub fn process_data(
        &self,
        data: D,
        attempts: u32,
        priority: u8,
        cancel: CancellationToken,
    ) -> Result<CompletionHandle<R>> {
        self.manager.submit(conveyor_task(data), attempts, priority, cancel)
    }

    /// Priority-lane counterpart of [`Conveyor::process_batch`], preserving
    /// input order in the result vector regardless of completion order or
    /// lane.
    pub async fn process_batch(
        &self,
        items: Vec<(D, u8)>,
        attempts: u32,
        cancel: CancellationToken,
    ) -> Result<Vec<Outcome<R>>> {
        let mut handles = Vec::with_capacity(items.len());
        for (data, priority) in items {
            handles.push(self.process_data(data, attempts, priority, cancel.clone())?);
        }
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.wait().await);
        }
        Ok(results)
    }

    #[must_use]
    pub fn worker(&self) -> &TaskWorker {
        &self.worker
    }
}

/// Producer handle for the time-based scheduler.
pub struct Scheduler<T> {
    manager: Arc<WorkSchedulerManager<T>>,
    pump: Arc<SchedulerPump>,
}

impl<T: Clone + Send + 'static> Scheduler<T> {
    /// Schedule `task` to run once, directly, at `fire_at`.
    pub fn add_scheduled_work(
        &self,
        task: Work<T>,
        attempts: u32,
        fire_at: chrono::DateTime<chrono::Utc>,
        cancel: CancellationToken,
    ) -> OnceHandle<T> {
        self.manager.add_scheduled_work(task, attempts, fire_at, cancel)
    }

    /// Schedule `task` to run once, forwarded into `target` at `fire_at`.
    pub fn add_scheduled_work_queued(
        &self,
        task: Work<T>,
        attempts: u32,
        fire_at: chrono::DateTime<chrono::Utc>,
        cancel: CancellationToken,
        target: Arc<dyn EnqueueTarget<T>>,
    ) -> OnceHandle<T> {
        self.manager
            .add_scheduled_work_queued(task, attempts, fire_at, cancel, target)
    }

    /// Schedule `task` to run directly every `step`.
    pub fn add_repeated_work(
        &self,
        task: Work<T>,
        attempts: u32,
        start: chrono::DateTime<chrono::Utc>,
        step: std::time::Duration,
        count: Option<u32>,
        cancel: CancellationToken,
    ) -> RecurringHandle<T> {
        self.manager
            .add_repeated_work(task, attempts, start, step, count, cancel)
    }

    /// Schedule `task` on a cron expression.
    pub fn add_cron_work(
        &self,
        task: Work<T>,
        attempts: u32,
        cron_expr: &str,
        count: Option<u32>,
        cancel: CancellationToken,
    ) -> Result<RecurringHandle<T>> {
        self.manager.add_cron_work(task, attempts, cron_expr, count, cancel)
    }

    /// Wire-shaped snapshot of every live entry, for diagnostics.
    #[must_use]
    pub fn list_jobs(&self) -> Vec<taskforge_scheduler::ScheduledJobInfo> {
        self.manager.list_jobs()
    }

    #[must_use]
    pub fn pump(&self) -> &SchedulerPump {
        &self.pump
    }
}
