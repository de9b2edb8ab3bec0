//! Conveyor managers: the work queue and priority work queue shapes
//! instantiated with a pooled [`ConveyorMachine`] as the processor argument.

use std::sync::Arc;

use taskforge_core::ConveyorMachine;

use crate::priority::PriorityQueueManager;
use crate::simple::SimpleQueueManager;

/// FIFO manager whose processor argument is a pooled conveyor machine.
pub type ConveyorManager<D, R> = SimpleQueueManager<Arc<dyn ConveyorMachine<D, R>>, R>;

/// Priority-partitioned manager whose processor argument is a pooled
/// conveyor machine.
pub type PriorityConveyorManager<D, R> = PriorityQueueManager<Arc<dyn ConveyorMachine<D, R>>, R>;
