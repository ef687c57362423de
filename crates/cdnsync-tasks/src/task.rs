use futures::future::BoxFuture;

use crate::error::TaskError;
use crate::imports::ImportsBundle;

pub type TaskFuture = BoxFuture<'static, Result<TaskReport, TaskError>>;

/// What a successful run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub records: usize,
}

/// A named import job.
///
/// `run` hands back a future that resolves exactly once. Implementations may
/// do setup work before returning the future; the runner treats a panic there
/// the same as a panic while the future is polled.
pub trait Task: Send + Sync {
    fn run(&self, imports: ImportsBundle) -> TaskFuture;
}
