//! In-memory record of what each scheduled task last did.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeState {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskStatus {
    pub name: String,
    /// Minutes of the hour the task fires at, e.g. `0,30`.
    pub minutes: Option<String>,
    pub schedule_error: Option<String>,
    pub runs: u64,
    pub last_state: Option<RunState>,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
    pub last_records: Option<usize>,
    pub last_error: Option<String>,
    pub purges: u64,
    pub last_purge: Option<PurgeState>,
    pub last_purge_at: Option<DateTime<Utc>>,
    pub last_purge_error: Option<String>,
}

/// Shared, cheaply cloneable status table keyed by task name.
#[derive(Debug, Clone, Default)]
pub struct TaskStatusBoard {
    inner: Arc<RwLock<BTreeMap<String, TaskStatus>>>,
}

impl TaskStatusBoard {
    async fn update(&self, task: &str, f: impl FnOnce(&mut TaskStatus)) {
        let mut map = self.inner.write().await;
        let entry = map.entry(task.to_owned()).or_insert_with(|| TaskStatus {
            name: task.to_owned(),
            ..TaskStatus::default()
        });
        f(entry);
    }

    pub async fn scheduled(&self, task: &str, minutes: String) {
        self.update(task, |s| {
            s.minutes = Some(minutes);
            s.schedule_error = None;
        })
        .await;
    }

    pub async fn schedule_failed(&self, task: &str, error: String) {
        self.update(task, |s| s.schedule_error = Some(error)).await;
    }

    pub async fn run_started(&self, task: &str) {
        self.update(task, |s| {
            s.runs += 1;
            s.last_state = Some(RunState::Running);
            s.last_started_at = Some(Utc::now());
        })
        .await;
    }

    pub async fn run_skipped(&self, task: &str) {
        self.update(task, |s| s.last_state = Some(RunState::Skipped))
            .await;
    }

    pub async fn run_finished(&self, task: &str, result: Result<usize, String>) {
        self.update(task, |s| {
            s.last_finished_at = Some(Utc::now());
            match result {
                Ok(records) => {
                    s.last_state = Some(RunState::Succeeded);
                    s.last_records = Some(records);
                    s.last_error = None;
                }
                Err(error) => {
                    s.last_state = Some(RunState::Failed);
                    s.last_records = None;
                    s.last_error = Some(error);
                }
            }
        })
        .await;
    }

    pub async fn purge_started(&self, task: &str) {
        self.update(task, |s| {
            s.purges += 1;
            s.last_purge = Some(PurgeState::Pending);
        })
        .await;
    }

    pub async fn purge_finished(&self, task: &str, result: Result<(), String>) {
        self.update(task, |s| {
            s.last_purge_at = Some(Utc::now());
            match result {
                Ok(()) => {
                    s.last_purge = Some(PurgeState::Succeeded);
                    s.last_purge_error = None;
                }
                Err(error) => {
                    s.last_purge = Some(PurgeState::Failed);
                    s.last_purge_error = Some(error);
                }
            }
        })
        .await;
    }

    pub async fn get(&self, task: &str) -> Option<TaskStatus> {
        self.inner.read().await.get(task).cloned()
    }

    /// All tasks, ordered by name.
    pub async fn snapshot(&self) -> Vec<TaskStatus> {
        self.inner.read().await.values().cloned().collect()
    }
}
