//! Background task scheduler.
//!
//! Every configured task gets one cron job that fires on the minutes of its
//! pattern (UTC), plus one immediate run at startup. Both paths go through
//! the same [`TaskRunner`].

pub mod purge;
pub mod runner;
pub mod status;

#[cfg(test)]
mod test_support;

use std::collections::BTreeMap;

use cdnsync_core::{MinutePattern, PatternError, RawPattern};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

pub use purge::{PurgeOutcome, PurgeTrigger, Purger};
pub use runner::{RunError, RunReport, TaskRunner};
pub use status::{TaskStatus, TaskStatusBoard};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("task {0} is already scheduled")]
    AlreadyScheduled(String),

    #[error("invalid pattern for task {task}: {source}")]
    Pattern {
        task: String,
        #[source]
        source: PatternError,
    },

    #[error("task {0} is not scheduled")]
    NotScheduled(String),

    #[error("job scheduler error: {0}")]
    Job(#[from] JobSchedulerError),
}

/// A task registered with the job scheduler.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub name: String,
    pub pattern: MinutePattern,
    pub job_id: Uuid,
}

pub struct TaskScheduler {
    scheduler: JobScheduler,
    runner: TaskRunner,
    jobs: BTreeMap<String, ScheduledJob>,
    failures: BTreeMap<String, String>,
    initial_runs: Vec<JoinHandle<RunReport>>,
}

impl TaskScheduler {
    /// Schedule every task in `tasks`, kick off one run of each, and start
    /// the job scheduler.
    ///
    /// A task whose pattern or job cannot be set up is logged, recorded in
    /// [`failures`](Self::failures) and on the status board, and skipped; the
    /// remaining tasks are still scheduled.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Job`] only if the job scheduler itself
    /// cannot be created or started.
    pub async fn start(
        tasks: &BTreeMap<String, RawPattern>,
        runner: TaskRunner,
    ) -> Result<Self, SchedulerError> {
        let scheduler = JobScheduler::new().await?;
        let mut this = Self {
            scheduler,
            runner,
            jobs: BTreeMap::new(),
            failures: BTreeMap::new(),
            initial_runs: Vec::new(),
        };

        for (name, raw) in tasks {
            match this.schedule(name, raw).await {
                Ok(job) => {
                    tracing::info!(
                        task = %name,
                        minutes = %job.pattern,
                        job_id = %job.job_id,
                        "scheduler: registered task"
                    );
                    this.runner
                        .board()
                        .scheduled(name, job.pattern.to_string())
                        .await;
                    this.spawn_initial_run(name);
                }
                Err(e) => {
                    tracing::error!(task = %name, error = %e, "scheduler: failed to schedule task");
                    this.runner
                        .board()
                        .schedule_failed(name, e.to_string())
                        .await;
                    this.failures.insert(name.clone(), e.to_string());
                }
            }
        }

        this.scheduler.start().await?;
        tracing::info!(jobs = this.jobs.len(), "scheduler: started");
        Ok(this)
    }

    /// Parse `raw` and register a cron job for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::AlreadyScheduled`] if `name` already has a
    /// job, [`SchedulerError::Pattern`] for a malformed pattern, or
    /// [`SchedulerError::Job`] if the job cannot be added.
    pub async fn schedule(
        &mut self,
        name: &str,
        raw: &RawPattern,
    ) -> Result<ScheduledJob, SchedulerError> {
        if self.jobs.contains_key(name) {
            return Err(SchedulerError::AlreadyScheduled(name.to_owned()));
        }

        let pattern = MinutePattern::try_from(raw).map_err(|source| SchedulerError::Pattern {
            task: name.to_owned(),
            source,
        })?;

        let runner = self.runner.clone();
        let task = name.to_owned();
        let expr = pattern.cron_expression();

        let job = Job::new_async(expr.as_str(), move |_uuid, _lock| {
            let runner = runner.clone();
            let task = task.clone();

            Box::pin(async move {
                tracing::debug!(task = %task, "scheduler: firing");
                // The purge handle is dropped; it finishes on its own.
                let _report = runner.run(&task).await;
            })
        })?;

        let job_id = self.scheduler.add(job).await?;
        let scheduled = ScheduledJob {
            name: name.to_owned(),
            pattern,
            job_id,
        };
        self.jobs.insert(name.to_owned(), scheduled.clone());
        Ok(scheduled)
    }

    fn spawn_initial_run(&mut self, name: &str) {
        let runner = self.runner.clone();
        let task = name.to_owned();
        self.initial_runs
            .push(tokio::spawn(async move { runner.run(&task).await }));
    }

    /// Jobs ordered by task name.
    #[must_use]
    pub fn jobs(&self) -> impl Iterator<Item = &ScheduledJob> {
        self.jobs.values()
    }

    #[must_use]
    pub fn job(&self, name: &str) -> Option<&ScheduledJob> {
        self.jobs.get(name)
    }

    /// Tasks that could not be scheduled, with the reason.
    #[must_use]
    pub fn failures(&self) -> &BTreeMap<String, String> {
        &self.failures
    }

    #[must_use]
    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    /// Handles of the startup runs spawned so far. Each is returned once.
    pub fn take_initial_runs(&mut self) -> Vec<JoinHandle<RunReport>> {
        std::mem::take(&mut self.initial_runs)
    }

    /// Remove the job for `name`; runs already in flight finish normally.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotScheduled`] for an unknown name or
    /// [`SchedulerError::Job`] if the scheduler rejects the removal.
    pub async fn cancel(&mut self, name: &str) -> Result<ScheduledJob, SchedulerError> {
        let Some(job) = self.jobs.remove(name) else {
            return Err(SchedulerError::NotScheduled(name.to_owned()));
        };
        self.scheduler.remove(&job.job_id).await?;
        tracing::info!(task = %name, "scheduler: cancelled task");
        Ok(job)
    }

    /// Stop firing all jobs.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Job`] if the job scheduler fails to stop.
    pub async fn shutdown(&mut self) -> Result<(), SchedulerError> {
        self.scheduler.shutdown().await?;
        self.jobs.clear();
        tracing::info!("scheduler: shut down");
        Ok(())
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("jobs", &self.jobs)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
