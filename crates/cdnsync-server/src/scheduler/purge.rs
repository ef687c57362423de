//! Fire-and-forget cache purge after a successful task run.

use std::sync::Arc;

use cdnsync_purge::{PurgeClient, PurgeError};
use futures::future::BoxFuture;
use tokio::task::JoinHandle;

use super::status::TaskStatusBoard;

pub type PurgeFuture = BoxFuture<'static, Result<(), PurgeError>>;

/// Something that can invalidate the CDN cache.
pub trait Purger: Send + Sync {
    fn purge(&self) -> PurgeFuture;
}

impl Purger for PurgeClient {
    fn purge(&self) -> PurgeFuture {
        let client = self.clone();
        Box::pin(async move { client.purge().await })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeOutcome {
    Purged,
    Failed(String),
}

/// Runs purges in the background and reports their outcome.
///
/// Outcomes are logged and recorded on the status board only; nothing is
/// returned to the task run that triggered the purge, and failures are not
/// retried.
#[derive(Clone)]
pub struct PurgeTrigger {
    purger: Arc<dyn Purger>,
    board: TaskStatusBoard,
}

impl PurgeTrigger {
    #[must_use]
    pub fn new(purger: Arc<dyn Purger>, board: TaskStatusBoard) -> Self {
        Self { purger, board }
    }

    /// Start a purge on behalf of `task`.
    ///
    /// The returned handle may be dropped; the purge keeps running.
    pub fn fire(&self, task: &str) -> JoinHandle<PurgeOutcome> {
        let purger = Arc::clone(&self.purger);
        let board = self.board.clone();
        let task = task.to_owned();

        tokio::spawn(async move {
            tracing::info!(task = %task, "purge: purging cache");
            board.purge_started(&task).await;

            match purger.purge().await {
                Ok(()) => {
                    tracing::info!(task = %task, "purge: cache purged");
                    board.purge_finished(&task, Ok(())).await;
                    PurgeOutcome::Purged
                }
                Err(e) => {
                    tracing::error!(task = %task, error = %e, "purge: cache purge failed");
                    let message = e.to_string();
                    board.purge_finished(&task, Err(message.clone())).await;
                    PurgeOutcome::Failed(message)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::test_support::CountingPurger;
    use crate::scheduler::status::PurgeState;

    #[tokio::test]
    async fn successful_purge_is_reported() {
        let purger = Arc::new(CountingPurger::default());
        let board = TaskStatusBoard::default();
        let trigger = PurgeTrigger::new(purger.clone(), board.clone());

        let outcome = trigger.fire("sync").await.expect("join");
        assert_eq!(outcome, PurgeOutcome::Purged);
        assert_eq!(purger.calls(), 1);
        let status = board.get("sync").await.expect("status");
        assert_eq!(status.last_purge, Some(PurgeState::Succeeded));
    }

    #[tokio::test]
    async fn failed_purge_is_reported_not_retried() {
        let purger = Arc::new(CountingPurger::failing("zone locked"));
        let board = TaskStatusBoard::default();
        let trigger = PurgeTrigger::new(purger.clone(), board.clone());

        let outcome = trigger.fire("sync").await.expect("join");
        assert_eq!(
            outcome,
            PurgeOutcome::Failed("purge API error: zone locked".to_string())
        );
        assert_eq!(purger.calls(), 1);
        let status = board.get("sync").await.expect("status");
        assert_eq!(status.last_purge, Some(PurgeState::Failed));
    }

    #[tokio::test]
    async fn purge_client_is_a_purger() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("DELETE"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"code": 200})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = PurgeClient::new(&cdnsync_purge::PurgeConfig {
            base_url: server.uri(),
            alias: "acme".to_string(),
            zone_id: "1".to_string(),
            key: "k".to_string(),
            secret: "s".to_string(),
            timeout_secs: 5,
            user_agent: "cdnsync-test".to_string(),
        })
        .expect("client");
        let purger: Arc<dyn Purger> = Arc::new(client);
        purger.purge().await.expect("purge succeeds");
    }
}
