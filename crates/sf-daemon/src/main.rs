use std::sync::Arc;

use sf_client::client::TrackerClient;
use sf_core::config::Config;
use sf_core::db::SprintforgeDb;
use sf_daemon::Daemon;
use tracing_subscriber::EnvFilter;

fn expand_home(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    std::path::PathBuf::from(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.general.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let db_path = expand_home(&config.cache.path);
    let db = Arc::new(SprintforgeDb::new(&db_path).await?);
    let sync_db = SprintforgeDb::new(&db_path).await?;
    let client = TrackerClient::new(&config.tracker, &config.rate_limit)?;

    let daemon = Daemon::new(config, db, sync_db, client);
    daemon.run().await
}
