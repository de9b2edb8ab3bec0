//! Time-based dispatch: delayed, fixed-interval, and cron scheduled work.
//!
//! - [`repeat`] -- `RepeatPolicy` and cron expression normalization.
//! - [`target`] -- `EnqueueTarget`, the "queued" inner-payload form.
//! - [`handle`] -- caller-facing `OnceHandle`/`RecurringHandle`.
//! - [`manager`] -- `WorkSchedulerManager`, the time-indexed entry collection.
//! - [`pump`] -- `SchedulerPump`, the sleep-until-next-fire loop.

pub mod handle;
pub mod manager;
pub mod pump;
pub mod repeat;
pub mod target;

pub use handle::{OnceHandle, RecurringHandle};
pub use manager::{ScheduledJobInfo, WorkSchedulerManager};
pub use pump::SchedulerPump;
pub use repeat::RepeatPolicy;
pub use target::{AtPriorityFor, EnqueueTarget};
