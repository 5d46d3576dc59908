//! Periodic sync batches: one incremental batch across every accessible
//! board on a configurable interval, cancelled cleanly on shutdown.

use std::sync::Arc;
use std::time::Duration;

use sf_core::cancel::CancellationToken;
use sf_harness::ShutdownSignal;
use sf_sync::SyncEngine;
use tracing::{error, info};

/// Spawns the sync-batch loop as a background task. Returns its join
/// handle so the caller can await a clean exit after shutdown.
pub fn spawn(sync: Arc<SyncEngine>, interval_secs: u64, shutdown: ShutdownSignal) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        interval.tick().await;
        let mut shutdown_rx = shutdown.subscribe();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let cancel = CancellationToken::new();
                    match sync.sync_sprints_bidirectional(None, true, None, &cancel).await {
                        Ok((sprints, history)) => {
                            info!(
                                synced = sprints.len(),
                                created = history.entities_created,
                                updated = history.entities_updated,
                                skipped = history.entities_skipped,
                                conflicts = history.conflicts_resolved,
                                "sync batch completed"
                            );
                        }
                        Err(e) => {
                            error!(error = %e, "sync batch failed");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("sync scheduler stopping");
                    break;
                }
            }
        }
    })
}
