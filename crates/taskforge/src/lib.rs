//! `taskforge`: an in-process background task dispatch engine -- work
//! queues, priority queues, access queues, conveyors, worker pools, and a
//! time-based scheduler, wired together behind a small typed Producer API.
//!
//! [`Host`] owns the shared [`taskforge_core::ServiceRegistry`], the
//! startup-work drain order, and coordinated shutdown; each pipeline type
//! (`WorkQueue`, `PriorityWorkQueue`, `AccessQueue`, `Conveyor`,
//! `PriorityConveyor`, `Scheduler`) exposes just its own slice of the
//! Producer API. See `host` for why the split, rather than one
//! monomorphic engine object.

pub mod config;
pub mod host;

pub use config::{ConfigOptions, ReuseStrategy};
pub use host::{AccessQueue, Conveyor, Host, PriorityConveyor, PriorityWorkQueue, Scheduler, WorkQueue};

pub use taskforge_core::{
    Access, CancelOrigin, CancellationToken, CompletionHandle, ConveyorMachine, Outcome, Result,
    ServiceRegistry, StartStoppable, TaskKind, TaskforgeError, Work,
};
pub use taskforge_processors::{
    ArgumentFactory, ArgumentProcessor, Inert, MultipleNullProcessor, MultipleOneTimeProcessor,
    MultipleReusableProcessor, MultipleStaticProcessor, NullArgumentProcessor, SingleOneTimeProcessor,
    SingleReusableProcessor, SingleStaticProcessor,
};
pub use taskforge_queues::{
    chain2, AccessQueueManager, Chain2, ConveyorManager, PriorityConveyorManager, PriorityQueueManager,
    PriorityWorkQueueManager, SimpleQueueManager, WorkQueueManager,
};
pub use taskforge_scheduler::{AtPriorityFor, EnqueueTarget, OnceHandle, RecurringHandle, RepeatPolicy, SchedulerPump, WorkSchedulerManager};
pub use taskforge_worker::{StartupRegistry, TaskWorker};
