pub mod audit;
pub mod forecast;
pub mod rate_limit;
pub mod sync;

use anyhow::Context;
use sf_core::config::Config;
use sf_core::db::SprintforgeDb;

/// Expand a leading `~` or `~/` to the user's home directory.
fn expand_tilde(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    std::path::PathBuf::from(path)
}

/// Loads config and opens the local database at its configured cache path.
/// Every operational command shares this: there is no running-daemon API
/// to call against, so the CLI reads and writes the same SQLite file the
/// daemon uses.
pub async fn open_db(config: &Config) -> anyhow::Result<SprintforgeDb> {
    let path = expand_tilde(&config.cache.path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    SprintforgeDb::new(&path)
        .await
        .with_context(|| format!("failed to open database at {}", path.display()))
}

pub fn load_config() -> anyhow::Result<Config> {
    Config::load().context("failed to load config")
}
