//! Resolves a task by name, runs it in isolation, and purges on success.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use cdnsync_tasks::{ImportsBundle, TaskError, TaskRegistry, TaskReport};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::purge::{PurgeOutcome, PurgeTrigger};
use super::status::TaskStatusBoard;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("task {0} is still running; firing skipped")]
    AlreadyRunning(String),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task was cancelled")]
    Cancelled,
}

/// Result of one firing.
///
/// `purge` is set only when the task succeeded. Dropping it leaves the purge
/// running in the background.
#[derive(Debug)]
pub struct RunReport {
    pub task: String,
    pub outcome: Result<TaskReport, RunError>,
    pub purge: Option<JoinHandle<PurgeOutcome>>,
}

struct RunnerInner {
    registry: TaskRegistry,
    imports: ImportsBundle,
    purge: PurgeTrigger,
    board: TaskStatusBoard,
    locks: HashMap<String, Arc<Mutex<()>>>,
}

#[derive(Clone)]
pub struct TaskRunner {
    inner: Arc<RunnerInner>,
}

impl TaskRunner {
    #[must_use]
    pub fn new(
        registry: TaskRegistry,
        imports: ImportsBundle,
        purge: PurgeTrigger,
        board: TaskStatusBoard,
    ) -> Self {
        let locks = registry
            .names()
            .into_iter()
            .map(|name| (name.to_owned(), Arc::new(Mutex::new(()))))
            .collect();

        Self {
            inner: Arc::new(RunnerInner {
                registry,
                imports,
                purge,
                board,
                locks,
            }),
        }
    }

    #[must_use]
    pub fn board(&self) -> &TaskStatusBoard {
        &self.inner.board
    }

    /// Run `name` once and, if it succeeds, fire a cache purge.
    ///
    /// Never panics and never returns early on task failure; every outcome is
    /// logged and recorded on the status board.
    pub async fn run(&self, name: &str) -> RunReport {
        let outcome = self.execute(name).await;
        let board = &self.inner.board;

        let purge = match &outcome {
            Ok(report) => {
                tracing::info!(task = %name, records = report.records, "runner: task succeeded");
                board.run_finished(name, Ok(report.records)).await;
                Some(self.inner.purge.fire(name))
            }
            Err(RunError::AlreadyRunning(_)) => {
                tracing::warn!(task = %name, "runner: previous run still in flight; skipping");
                board.run_skipped(name).await;
                None
            }
            Err(e) => {
                tracing::error!(task = %name, error = %e, "runner: task failed");
                board.run_finished(name, Err(e.to_string())).await;
                None
            }
        };

        RunReport {
            task: name.to_owned(),
            outcome,
            purge,
        }
    }

    async fn execute(&self, name: &str) -> Result<TaskReport, RunError> {
        let task = self
            .inner
            .registry
            .get(name)
            .ok_or_else(|| RunError::UnknownTask(name.to_owned()))?;

        // Registered tasks always have a lock.
        let lock = self
            .inner
            .locks
            .get(name)
            .cloned()
            .ok_or_else(|| RunError::UnknownTask(name.to_owned()))?;
        let Ok(_guard) = lock.try_lock_owned() else {
            return Err(RunError::AlreadyRunning(name.to_owned()));
        };

        self.inner.board.run_started(name).await;
        tracing::info!(task = %name, "runner: starting task");

        let imports = self.inner.imports.clone();
        let handle = tokio::spawn(async move { task.run(imports).await });

        match handle.await {
            Ok(result) => result.map_err(RunError::from),
            Err(e) if e.is_panic() => Err(RunError::Panicked(panic_message(&*e.into_panic()))),
            Err(_) => Err(RunError::Cancelled),
        }
    }
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
