//! Server startup: storage, registries, scheduler, then the HTTP listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cdnsync_core::{AppConfig, ConfigError, SchemaRegistry, SyncFile};
use cdnsync_purge::{PurgeClient, PurgeConfig, PurgeError};
use cdnsync_tasks::{ImportsBundle, TaskRegistry};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::api::{build_app, default_rate_limit_state, AppState};
use crate::scheduler::{
    PurgeTrigger, SchedulerError, TaskRunner, TaskScheduler, TaskStatusBoard,
};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to connect to storage: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to run migrations: {0}")]
    Migrate(#[source] cdnsync_db::DbError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build purge client: {0}")]
    Purge(#[from] PurgeError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to start scheduler: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Connect to storage and run the server until it stops.
///
/// `ready` receives the bound address once the listener is up. If storage
/// is unreachable nothing else is started and `ready` is dropped unsent.
///
/// # Errors
///
/// Returns [`BootstrapError::Connect`] if storage is unreachable, or any
/// error from [`serve`].
pub async fn run(
    config: &AppConfig,
    sync_file: SyncFile,
    ready: Option<oneshot::Sender<SocketAddr>>,
) -> Result<(), BootstrapError> {
    let pool_config = cdnsync_db::PoolConfig::from_app_config(config);
    let pool = cdnsync_db::connect_pool(&config.database_url, pool_config)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "bootstrap: storage connection failed; aborting startup");
            BootstrapError::Connect(e)
        })?;
    tracing::info!("bootstrap: connected to storage");

    serve(pool, config, sync_file, ready).await
}

/// Run the server on an already connected pool.
///
/// # Errors
///
/// Returns a [`BootstrapError`] for the first startup step that fails, or
/// [`BootstrapError::Serve`] if the listener dies.
pub async fn serve(
    pool: PgPool,
    config: &AppConfig,
    sync_file: SyncFile,
    ready: Option<oneshot::Sender<SocketAddr>>,
) -> Result<(), BootstrapError> {
    cdnsync_db::run_migrations(&pool)
        .await
        .map_err(BootstrapError::Migrate)?;

    let schemas = Arc::new(SchemaRegistry::build(&sync_file.cdns)?);
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(config.user_agent.as_str())
        .build()?;
    let purge_client = PurgeClient::new(&purge_config(config, &sync_file))?;

    let board = TaskStatusBoard::default();
    let imports = ImportsBundle {
        pool: pool.clone(),
        http,
        sync_url: sync_file.sync_url.as_str().into(),
        cdns: sync_file.cdns.clone().into(),
        schemas: Arc::clone(&schemas),
    };
    let runner = TaskRunner::new(
        TaskRegistry::builtin(),
        imports,
        PurgeTrigger::new(Arc::new(purge_client), board.clone()),
        board.clone(),
    );

    // Dropping the scheduler stops every job; keep it for the server's lifetime.
    let _scheduler = TaskScheduler::start(&sync_file.tasks, runner).await?;

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| BootstrapError::Bind { addr, source })?;
    let local_addr = listener.local_addr().map_err(BootstrapError::Serve)?;
    tracing::info!(addr = %local_addr, env = %config.env, "server started");
    if let Some(ready) = ready {
        let _ = ready.send(local_addr);
    }

    let app = build_app(
        AppState {
            pool,
            schemas,
            board,
        },
        default_rate_limit_state(),
    );
    axum::serve(listener, app)
        .await
        .map_err(BootstrapError::Serve)?;

    tracing::info!("server stopped");
    Ok(())
}

fn purge_config(config: &AppConfig, sync_file: &SyncFile) -> PurgeConfig {
    PurgeConfig {
        base_url: sync_file.purge.base_url.clone(),
        alias: sync_file.purge.alias.clone(),
        zone_id: sync_file.purge.zone_id.clone(),
        key: config.purge_key.clone(),
        secret: config.purge_secret.clone(),
        timeout_secs: config.http_timeout_secs,
        user_agent: config.user_agent.clone(),
    }
}

#[cfg(test)]
#[path = "bootstrap_test.rs"]
mod tests;
