//! Fakes shared by the runner and scheduler tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cdnsync_core::{CdnDefinition, SchemaRegistry};
use cdnsync_purge::PurgeError;
use cdnsync_tasks::{ImportsBundle, Task, TaskError, TaskFuture, TaskRegistry, TaskReport};
use sqlx::postgres::PgPoolOptions;

use super::purge::{PurgeFuture, PurgeTrigger, Purger};
use super::runner::TaskRunner;
use super::status::TaskStatusBoard;

/// Counts purge calls and answers with a fixed result.
#[derive(Default)]
pub struct CountingPurger {
    calls: AtomicUsize,
    fail_with: Option<String>,
}

impl CountingPurger {
    pub fn failing(message: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Purger for CountingPurger {
    fn purge(&self) -> PurgeFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = match &self.fail_with {
            Some(message) => Err(PurgeError::Api(message.clone())),
            None => Ok(()),
        };
        Box::pin(async move { result })
    }
}

/// Succeeds with `records` after an optional delay, counting invocations.
pub struct CountingTask {
    pub calls: Arc<AtomicUsize>,
    pub records: usize,
    pub delay: Duration,
}

impl CountingTask {
    pub fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            records: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn slow(calls: Arc<AtomicUsize>, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(calls)
        }
    }
}

impl Task for CountingTask {
    fn run(&self, _imports: ImportsBundle) -> TaskFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let records = self.records;
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(TaskReport { records })
        })
    }
}

pub struct FailingTask;

impl Task for FailingTask {
    fn run(&self, _imports: ImportsBundle) -> TaskFuture {
        Box::pin(async { Err(TaskError::Failed("upstream exploded".to_string())) })
    }
}

/// Panics before returning a future.
pub struct PanickingTask;

impl Task for PanickingTask {
    fn run(&self, _imports: ImportsBundle) -> TaskFuture {
        panic!("task blew up");
    }
}

/// Panics while being polled.
pub struct PanickingFutureTask;

impl Task for PanickingFutureTask {
    fn run(&self, _imports: ImportsBundle) -> TaskFuture {
        Box::pin(async { panic!("future blew up") })
    }
}

/// Bundle whose pool never connects; fakes do not touch it.
pub fn lazy_imports() -> ImportsBundle {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy("postgres://cdnsync@127.0.0.1:1/cdnsync")
        .expect("lazy pool");
    let cdns = vec![CdnDefinition {
        name: "jsDelivr".to_string(),
        slug: None,
        source_key: None,
        url: None,
    }];
    let schemas = SchemaRegistry::build(&cdns).expect("registry");

    ImportsBundle {
        pool,
        http: reqwest::Client::new(),
        sync_url: "http://127.0.0.1:1/data.json".into(),
        cdns: cdns.into(),
        schemas: Arc::new(schemas),
    }
}

pub fn runner_with(registry: TaskRegistry, purger: Arc<CountingPurger>) -> TaskRunner {
    let board = TaskStatusBoard::default();
    let trigger = PurgeTrigger::new(purger, board.clone());
    TaskRunner::new(registry, lazy_imports(), trigger, board)
}
