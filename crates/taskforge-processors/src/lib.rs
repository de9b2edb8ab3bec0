//! Task processors: the eight argument-acquisition policies from
//! `SPEC_FULL.md` §4.3, each generic over any `S: TaskSource<Arg, T>`.
//!
//! - [`null`] -- `NullArgument`/`SingleNull`, `MultipleNull(maxSimultaneous)`.
//! - [`static_arg`] -- `SingleStatic(arg)`, `MultipleStatic([arg...])`.
//! - [`reusable`] -- `SingleReusable(factory)`, `MultipleReusable(factory, n)`.
//! - [`one_time`] -- `SingleOneTime(factory)`, `MultipleOneTime(factory, n)`.
//! - [`inert`] -- `Inert<Arg>`, a no-op `StartStoppable` adapter for
//!   reusable/one-time arguments with nothing to activate.
//! - [`traits`] -- the shared `ArgumentProcessor` pump contract.

pub mod inert;
pub mod null;
pub mod one_time;
pub mod reusable;
pub mod static_arg;
pub mod traits;

pub use inert::Inert;
pub use null::{MultipleNullProcessor, NullArgumentProcessor};
pub use one_time::{MultipleOneTimeProcessor, SingleOneTimeProcessor};
pub use reusable::{MultipleReusableProcessor, SingleReusableProcessor};
pub use static_arg::{MultipleStaticProcessor, SingleStaticProcessor};
pub use traits::{ArgumentFactory, ArgumentProcessor};
