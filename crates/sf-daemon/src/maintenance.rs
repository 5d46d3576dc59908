//! Audit-log maintenance: periodic retention enforcement and chain
//! integrity verification, run alongside the sync and webhook loops.

use std::sync::Arc;
use std::time::Duration;

use sf_audit::{retention, verify};
use sf_core::db::SprintforgeDb;
use sf_harness::ShutdownSignal;
use tracing::{error, info, warn};

pub fn spawn(db: Arc<SprintforgeDb>, sweep_interval_secs: u64, shutdown: ShutdownSignal) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval_secs.max(1)));
        interval.tick().await;
        let mut shutdown_rx = shutdown.subscribe();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match retention::apply_retention_policy(&db, false).await {
                        Ok(result) if !result.events.is_empty() => {
                            info!(deleted = result.events.len(), "audit retention sweep deleted expired events");
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "audit retention sweep failed"),
                    }

                    match verify::verify_chain_integrity(&db).await {
                        Ok(report) if !report.is_intact() => {
                            warn!(broken_links = report.broken_links.len(), "audit chain integrity check found broken links");
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "audit chain integrity check failed"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("audit maintenance sweep stopping");
                    break;
                }
            }
        }
    })
}
