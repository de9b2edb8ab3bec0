//! Task managers: the pending-wrapper collections from `SPEC_FULL.md` §4.2.
//!
//! - [`simple`] -- the single-lane FIFO (`WorkQueueManager`, the access
//!   queue's and conveyor's backing store).
//! - [`priority`] -- the priority-partitioned FIFO (`PriorityWorkQueueManager`,
//!   the priority conveyor's backing store).
//! - [`access`] -- `AccessQueueManager<R, T>`, a FIFO with a `max_attempts`
//!   ceiling for a serialized shared resource.
//! - [`conveyor`] -- `ConveyorManager`/`PriorityConveyorManager` type
//!   aliases over a pooled [`taskforge_core::ConveyorMachine`] argument.
//! - [`chain`] -- multi-stage conveyor composition (`SPEC_FULL.md` §4.6).

pub mod access;
pub mod chain;
pub mod conveyor;
pub mod priority;
pub mod simple;

pub use access::AccessQueueManager;
pub use chain::{chain2, Chain2};
pub use conveyor::{ConveyorManager, PriorityConveyorManager};
pub use priority::PriorityQueueManager;
pub use simple::SimpleQueueManager;

/// Spec vocabulary alias: a single FIFO over argument-less work.
pub type WorkQueueManager<T> = SimpleQueueManager<(), T>;

/// Spec vocabulary alias: a priority-partitioned FIFO over argument-less
/// work.
pub type PriorityWorkQueueManager<T> = PriorityQueueManager<(), T>;
