//! Pool of tasks draining the webhook queue, each event owned by exactly
//! one worker for its whole processing attempt.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sf_core::db::SprintforgeDb;
use sf_core::types::ProcessingStatus;
use sf_sync::SyncEngine;
use tracing::{error, info, warn};

use crate::dispatch;
use crate::error::Result;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_SECS: u64 = 60;

/// Shared state handed to every worker task.
pub struct WorkerPool {
    db: Arc<SprintforgeDb>,
    sync: Arc<SyncEngine>,
    sender: flume::Sender<i64>,
    receiver: flume::Receiver<i64>,
    max_attempts: u32,
}

impl WorkerPool {
    pub fn new(db: Arc<SprintforgeDb>, sync: Arc<SyncEngine>, max_attempts: u32) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { db, sync, sender, receiver, max_attempts: max_attempts.max(1) }
    }

    /// Queue handle for the ingestor to publish newly-accepted event ids on.
    pub fn sender(&self) -> flume::Sender<i64> {
        self.sender.clone()
    }

    /// Spawns `pool_size` worker tasks (clamped to at least 2, per the
    /// concurrency requirement that no single worker serializes the whole
    /// queue) and returns their join handles.
    pub fn spawn(&self, pool_size: usize) -> Vec<tokio::task::JoinHandle<()>> {
        let pool_size = pool_size.max(2);
        (0..pool_size)
            .map(|worker_idx| {
                let db = self.db.clone();
                let sync = self.sync.clone();
                let receiver = self.receiver.clone();
                let sender = self.sender.clone();
                let max_attempts = self.max_attempts;
                tokio::spawn(async move {
                    run_worker(worker_idx, db, sync, receiver, sender, max_attempts).await;
                })
            })
            .collect()
    }
}

async fn run_worker(
    worker_idx: usize,
    db: Arc<SprintforgeDb>,
    sync: Arc<SyncEngine>,
    receiver: flume::Receiver<i64>,
    sender: flume::Sender<i64>,
    max_attempts: u32,
) {
    while let Ok(event_id) = receiver.recv_async().await {
        if let Err(e) = process_one(&db, &sync, &sender, event_id, max_attempts).await {
            error!(worker_idx, event_id, error = %e, "webhook event processing failed unrecoverably");
        }
    }
}

/// One full attempt at one event: load, mark processing, dispatch, record
/// outcome, schedule a backed-off retry on failure.
async fn process_one(
    db: &SprintforgeDb,
    sync: &SyncEngine,
    requeue: &flume::Sender<i64>,
    event_id: i64,
    max_attempts: u32,
) -> Result<()> {
    let Some(mut event) = db.get_webhook_event(event_id).await? else {
        warn!(event_id, "webhook event vanished before processing");
        return Ok(());
    };

    event.processing_status = ProcessingStatus::Processing;
    event.attempts += 1;
    event.last_processed_at = Some(Utc::now());
    db.update_webhook_event(&event).await?;

    match dispatch::dispatch(db, sync, &event).await {
        Ok(processed_data) => {
            event.processing_status = ProcessingStatus::Completed;
            event.error = None;
            event.processed_data = processed_data;
            db.update_webhook_event(&event).await?;
        }
        Err(e) => {
            event.processing_status = ProcessingStatus::Failed;
            event.error = Some(e.to_string());
            db.update_webhook_event(&event).await?;

            if event.attempts < max_attempts as i64 {
                let backoff = RETRY_BASE_SECS * 2u64.pow(event.attempts as u32);
                warn!(event_id, attempts = event.attempts, backoff_secs = backoff, error = %e, "webhook event failed, scheduling retry");
                let requeue = requeue.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    let _ = requeue.send_async(event_id).await;
                });
            } else {
                error!(event_id, attempts = event.attempts, error = %e, "webhook event failed terminally");
            }
        }
    }

    Ok(())
}

pub fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sf_client::client::TrackerClient;
    use sf_core::config::{RateLimitConfig, TrackerConfig};
    use sf_core::types::{ProcessingStatus, WebhookEvent};

    fn test_sync_engine(db: SprintforgeDb) -> SyncEngine {
        let tracker = TrackerConfig {
            base_url: "https://example.atlassian.net".into(),
            auth_method: sf_core::config::TrackerAuthMethod::Token,
            username: Some("bot@example.com".into()),
            auth_token: Some("token".into()),
            password: None,
            oauth: None,
            cloud_hostname_suffix: None,
        };
        let client = TrackerClient::new(&tracker, &RateLimitConfig::default()).unwrap();
        SyncEngine::new(db, client)
    }

    #[tokio::test]
    async fn unknown_event_type_completes_as_a_no_op() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let event = WebhookEvent {
            id: 0,
            event_id: "evt-x".into(),
            event_type: "jira:comment_added".into(),
            payload: json!({}),
            processing_status: ProcessingStatus::Pending,
            attempts: 0,
            last_processed_at: None,
            error: None,
            processed_data: None,
            received_at: Utc::now(),
        };
        let (id, _) = db.insert_webhook_event_idempotent(&event).await.unwrap();

        let sync = test_sync_engine(SprintforgeDb::new_in_memory().await.unwrap());
        let (tx, _rx) = flume::unbounded();
        process_one(&db, &sync, &tx, id, 3).await.unwrap();

        let fetched = db.get_webhook_event(id).await.unwrap().unwrap();
        assert_eq!(fetched.processing_status, ProcessingStatus::Completed);
        assert_eq!(fetched.attempts, 1);
    }

    #[tokio::test]
    async fn missing_mapping_template_fails_and_schedules_a_retry() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let event = WebhookEvent {
            id: 0,
            event_id: "evt-y".into(),
            event_type: "jira:issue_updated".into(),
            payload: json!({"fields": {"summary": "hi"}}),
            processing_status: ProcessingStatus::Pending,
            attempts: 0,
            last_processed_at: None,
            error: None,
            processed_data: None,
            received_at: Utc::now(),
        };
        let (id, _) = db.insert_webhook_event_idempotent(&event).await.unwrap();

        let sync = test_sync_engine(SprintforgeDb::new_in_memory().await.unwrap());
        let (tx, _rx) = flume::unbounded();
        process_one(&db, &sync, &tx, id, 3).await.unwrap();

        let fetched = db.get_webhook_event(id).await.unwrap().unwrap();
        assert_eq!(fetched.processing_status, ProcessingStatus::Failed);
        assert_eq!(fetched.attempts, 1);
        assert!(fetched.error.is_some());
    }
}
