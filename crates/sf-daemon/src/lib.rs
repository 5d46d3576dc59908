//! Background process: webhook worker pool, webhook maintenance sweeps,
//! periodic sync batches, and audit-log maintenance, all sharing one
//! `ShutdownSignal` and selecting between their own interval ticks.

pub mod maintenance;
pub mod sync_scheduler;

use std::sync::Arc;

use sf_core::config::Config;
use sf_core::db::SprintforgeDb;
use sf_harness::ShutdownSignal;
use sf_sync::SyncEngine;
use sf_webhook::WorkerPool;
use tracing::info;

/// Owns every long-running task this process hosts and the shared
/// `ShutdownSignal` that stops them together.
pub struct Daemon {
    config: Config,
    db: Arc<SprintforgeDb>,
    sync: Arc<SyncEngine>,
    worker_pool: WorkerPool,
    shutdown: ShutdownSignal,
}

impl Daemon {
    /// `db` backs ingestion, the worker pool, and audit maintenance;
    /// `sync_db` is a second connection to the same database file handed
    /// to the sync engine, which takes ownership of its own `SprintforgeDb`
    /// rather than sharing the `Arc` - SQLite tolerates multiple
    /// connections against one file, so this is just two handles to the
    /// same durable state rather than two databases.
    pub fn new(config: Config, db: Arc<SprintforgeDb>, sync_db: SprintforgeDb, client: sf_client::client::TrackerClient) -> Self {
        let sync = Arc::new(SyncEngine::new(sync_db, client));
        let worker_pool = WorkerPool::new(db.clone(), sync.clone(), config.webhook.max_attempts);
        Self { config, db, sync, worker_pool, shutdown: ShutdownSignal::new() }
    }

    pub fn shutdown_handle(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn webhook_sender(&self) -> flume::Sender<i64> {
        self.worker_pool.sender()
    }

    /// Spawns every background task and blocks until shutdown is
    /// triggered and all loops have observed it.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            sync_interval_secs = self.config.sync.sync_interval_secs,
            retention_sweep_secs = self.config.audit.retention_sweep_secs,
            worker_pool_size = self.config.webhook.worker_pool_size,
            "daemon starting"
        );

        let worker_handles = self.worker_pool.spawn(self.config.webhook.worker_pool_size);

        let periodic_handle = sf_webhook::periodic::spawn(
            self.db.clone(),
            self.worker_pool.sender(),
            self.config.webhook.max_attempts,
        );

        let sync_handle = sync_scheduler::spawn(self.sync.clone(), self.config.sync.sync_interval_secs, self.shutdown.clone());

        let maintenance_handle =
            maintenance::spawn(self.db.clone(), self.config.audit.retention_sweep_secs, self.shutdown.clone());

        tokio::signal::ctrl_c().await?;
        info!("ctrl-c received, shutting down");
        self.shutdown.trigger();

        let _ = tokio::join!(sync_handle, maintenance_handle);
        periodic_handle.abort();
        for handle in worker_handles {
            handle.abort();
        }

        info!("daemon stopped");
        Ok(())
    }
}
