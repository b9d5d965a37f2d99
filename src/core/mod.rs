//! Core task model: completion protocol, tasks, registries and composition.
//!
//! Leaves of every shape are wrapped into a [`Leaf`] at registration time,
//! registered into a per-scope [`TaskRegistry`], and combined into [`Node`]
//! trees that run with series or parallel semantics.

pub mod completion;
pub mod compose;
pub mod context;
pub mod registry;
pub mod task;

pub use completion::{Completion, Done, Leaf};
pub use compose::{Node, ParallelMode};
pub use context::{Context, RunEvent, RunId};
pub use registry::TaskRegistry;
pub use task::Task;
