use anyhow::Context;
use sf_client::client::TrackerClient;
use sf_core::cancel::CancellationToken;
use sf_sync::SyncEngine;

use super::{load_config, open_db};

/// Runs a single sync batch against every accessible board and prints the
/// resulting history. `incremental` skips entities whose content hash is
/// unchanged since the last sync.
pub async fn run(incremental: bool, json_output: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let db = open_db(&config).await?;
    let client = TrackerClient::new(&config.tracker, &config.rate_limit).context("failed to build tracker client")?;
    let engine = SyncEngine::new(db, client);
    let cancel = CancellationToken::new();

    let (sprints, history) = engine
        .sync_sprints_bidirectional(None, incremental, None, &cancel)
        .await
        .context("sync batch failed")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({
            "sprints_synced": sprints.len(),
            "history": history,
        }))?);
    } else {
        println!("sync batch complete ({})", if incremental { "incremental" } else { "full" });
        println!("  sprints synced:      {}", sprints.len());
        println!("  entities created:    {}", history.entities_created);
        println!("  entities updated:    {}", history.entities_updated);
        println!("  entities skipped:    {}", history.entities_skipped);
        println!("  conflicts resolved:  {}", history.conflicts_resolved);
    }

    Ok(())
}
