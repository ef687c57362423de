//! Import tasks run by the scheduler.
//!
//! Each task is registered under a name in a [`TaskRegistry`] and receives a
//! fresh [`ImportsBundle`] on every run.

pub mod error;
pub mod imports;
pub mod registry;
pub mod sync;
pub mod task;

pub use error::TaskError;
pub use imports::ImportsBundle;
pub use registry::TaskRegistry;
pub use sync::SyncTask;
pub use task::{Task, TaskFuture, TaskReport};
