use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cdnsync_tasks::TaskRegistry;

use super::*;
use crate::scheduler::purge::PurgeOutcome;
use crate::scheduler::status::{PurgeState, RunState};
use crate::scheduler::test_support::{
    runner_with, CountingPurger, CountingTask, FailingTask, PanickingFutureTask, PanickingTask,
};

#[tokio::test]
async fn success_purges_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = TaskRegistry::new();
    registry.register("sync", CountingTask::new(Arc::clone(&calls)));
    let purger = Arc::new(CountingPurger::default());
    let runner = runner_with(registry, Arc::clone(&purger));

    let report = runner.run("sync").await;
    assert_eq!(report.task, "sync");
    assert_eq!(report.outcome.expect("success").records, 1);
    let outcome = report.purge.expect("purge fired").await.expect("join");
    assert_eq!(outcome, PurgeOutcome::Purged);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(purger.calls(), 1);

    let status = runner.board().get("sync").await.expect("status");
    assert_eq!(status.last_state, Some(RunState::Succeeded));
    assert_eq!(status.last_purge, Some(PurgeState::Succeeded));
}

#[tokio::test]
async fn task_error_skips_purge() {
    let mut registry = TaskRegistry::new();
    registry.register("sync", FailingTask);
    let purger = Arc::new(CountingPurger::default());
    let runner = runner_with(registry, Arc::clone(&purger));

    let report = runner.run("sync").await;
    let err = report.outcome.expect_err("task fails");
    assert!(matches!(err, RunError::Task(_)), "{err}");
    assert!(report.purge.is_none());
    assert_eq!(purger.calls(), 0);

    let status = runner.board().get("sync").await.expect("status");
    assert_eq!(status.last_state, Some(RunState::Failed));
    assert_eq!(status.last_error.as_deref(), Some("upstream exploded"));
}

#[tokio::test]
async fn panic_before_future_is_contained() {
    let mut registry = TaskRegistry::new();
    registry.register("boom", PanickingTask);
    let purger = Arc::new(CountingPurger::default());
    let runner = runner_with(registry, Arc::clone(&purger));

    let report = runner.run("boom").await;
    match report.outcome {
        Err(RunError::Panicked(message)) => assert_eq!(message, "task blew up"),
        other => panic!("expected panic outcome, got {other:?}"),
    }
    assert!(report.purge.is_none());
    assert_eq!(purger.calls(), 0);
}

#[tokio::test]
async fn panic_while_polled_is_contained() {
    let mut registry = TaskRegistry::new();
    registry.register("boom", PanickingFutureTask);
    let purger = Arc::new(CountingPurger::default());
    let runner = runner_with(registry, Arc::clone(&purger));

    let report = runner.run("boom").await;
    assert!(matches!(report.outcome, Err(RunError::Panicked(_))));
    assert_eq!(purger.calls(), 0);

    // The runner stays usable after a panic.
    let again = runner.run("boom").await;
    assert!(matches!(again.outcome, Err(RunError::Panicked(_))));
    let status = runner.board().get("boom").await.expect("status");
    assert_eq!(status.runs, 2);
}

#[tokio::test]
async fn unknown_task_is_a_failed_run() {
    let purger = Arc::new(CountingPurger::default());
    let runner = runner_with(TaskRegistry::new(), Arc::clone(&purger));

    let report = runner.run("missing").await;
    assert!(matches!(report.outcome, Err(RunError::UnknownTask(ref n)) if n == "missing"));
    assert!(report.purge.is_none());
    assert_eq!(purger.calls(), 0);
}

#[tokio::test]
async fn purge_failure_leaves_run_successful() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = TaskRegistry::new();
    registry.register("sync", CountingTask::new(calls));
    let purger = Arc::new(CountingPurger::failing("zone locked"));
    let runner = runner_with(registry, Arc::clone(&purger));

    let report = runner.run("sync").await;
    assert!(report.outcome.is_ok());
    let outcome = report.purge.expect("purge fired").await.expect("join");
    assert!(matches!(outcome, PurgeOutcome::Failed(_)));
    assert_eq!(purger.calls(), 1);

    let status = runner.board().get("sync").await.expect("status");
    assert_eq!(status.last_state, Some(RunState::Succeeded));
    assert_eq!(status.last_purge, Some(PurgeState::Failed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overlapping_run_is_skipped() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = TaskRegistry::new();
    registry.register(
        "slow",
        CountingTask::slow(Arc::clone(&calls), Duration::from_millis(300)),
    );
    let purger = Arc::new(CountingPurger::default());
    let runner = runner_with(registry, Arc::clone(&purger));

    let first = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.run("slow").await })
    };
    // Let the first run take the lock.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = runner.run("slow").await;
    assert!(matches!(second.outcome, Err(RunError::AlreadyRunning(_))));
    assert!(second.purge.is_none());

    let first = first.await.expect("join");
    assert!(first.outcome.is_ok());
    first.purge.expect("purge fired").await.expect("join");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(purger.calls(), 1);

    // Once the first run is done the task can fire again.
    let third = runner.run("slow").await;
    assert!(third.outcome.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
