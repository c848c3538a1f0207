//! Bounded-concurrency task execution.
//!
//! [`BoundedRunner`] dispatches `total` tasks in index order while keeping at most
//! `limit` of them in flight, and folds every result into a [`RunReport`](kvburst_model::RunReport).

pub mod error;
pub use error::CoreError;

pub mod runner;
pub use runner::{BoundedRunner, RunnerConfig};

pub mod task;
pub use task::{Task, TaskFn, TaskFuture, TaskRef};

pub mod prelude {
    pub use crate::error::CoreError;
    pub use crate::runner::{BoundedRunner, RunnerConfig};
    pub use crate::task::{Task, TaskFn, TaskRef};
    pub use kvburst_model::{ErrorPolicy, RunReport, StopReason, TaskError, TaskIndex, TaskResult};
}
