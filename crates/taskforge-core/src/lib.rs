//! Core primitives for the taskforge background task engine:
//!
//! - [`cancel`] -- cooperative inner/outer cancellation tokens.
//! - [`registry`] -- a typed service registry (DI container replacement).
//! - [`completion`] -- caller-side completion handles, settled exactly once.
//! - [`task_value`] -- immutable task descriptions (`TaskKind`, `StartStoppable`,
//!   `ConveyorMachine`).
//! - [`wrapper`] -- per-submission mutable state and the `Execute` contract.
//! - [`source`] -- the worker-side manager contract (`TaskSource`).
//! - [`error`] -- the unified error taxonomy.

pub mod cancel;
pub mod completion;
pub mod error;
pub mod registry;
pub mod source;
pub mod task_value;
pub mod wrapper;

pub use cancel::{CancelOrigin, CancellationToken};
pub use completion::{CompletionHandle, Outcome};
pub use error::{Result, TaskforgeError};
pub use registry::ServiceRegistry;
pub use source::TaskSource;
pub use task_value::{Access, BoxFuture, ConveyorMachine, StartStoppable, TaskKind, Work};
pub use wrapper::TaskWrapper;
