use cdnsync_server::{bootstrap, lifecycle};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = cdnsync_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let sync_file = cdnsync_core::load_sync_file(&config.config_path)?;
    tracing::info!(
        path = %config.config_path.display(),
        cdns = sync_file.cdns.len(),
        tasks = sync_file.tasks.len(),
        "loaded sync file"
    );

    lifecycle::install_terminator()?;
    bootstrap::run(&config, sync_file, None).await?;
    Ok(())
}
