//! Maintenance sweeps run on a timer alongside the worker pool: retry
//! failed-but-retryable events, watch throughput, and age out old rows.

use chrono::{Duration as ChronoDuration, Utc};
use sf_core::db::SprintforgeDb;
use tracing::{info, warn};

const RETRY_BATCH_SIZE: i64 = 50;
const RETRY_WINDOW_HOURS: i64 = 24;
const CLEANUP_AGE_DAYS: i64 = 30;
const THROUGHPUT_ALERT_PER_MIN: f64 = 200.0;
const FAILURE_RATE_ALERT: f64 = 0.10;

/// Re-queues events that failed with attempts remaining and were received
/// within the retry window. Returns how many were re-queued.
pub async fn retry_sweep(db: &SprintforgeDb, sender: &flume::Sender<i64>, max_attempts: i64) -> crate::error::Result<usize> {
    let since = Utc::now() - ChronoDuration::hours(RETRY_WINDOW_HOURS);
    let retryable = db.list_retryable_webhook_events(max_attempts, since, RETRY_BATCH_SIZE).await?;
    let count = retryable.len();
    for event in retryable {
        let _ = sender.send_async(event.id).await;
    }
    if count > 0 {
        info!(count, "retry sweep re-queued failed webhook events");
    }
    Ok(count)
}

/// Counts events received in the last 5 minutes and logs an alert if
/// throughput or failure rate crosses the configured thresholds.
pub async fn throughput_monitor(db: &SprintforgeDb) -> crate::error::Result<()> {
    let since = Utc::now() - ChronoDuration::minutes(5);
    let (total, failed) = db.count_webhook_events_since(since).await?;

    let per_minute = total as f64 / 5.0;
    let failure_rate = if total > 0 { failed as f64 / total as f64 } else { 0.0 };

    if per_minute > THROUGHPUT_ALERT_PER_MIN {
        warn!(events_per_min = per_minute, "webhook throughput alert: exceeds target sustained rate");
    }
    if failure_rate > FAILURE_RATE_ALERT {
        warn!(failure_rate, total, failed, "webhook failure rate alert");
    }
    Ok(())
}

/// Deletes terminal-status events older than the retention window.
pub async fn cleanup(db: &SprintforgeDb) -> crate::error::Result<usize> {
    let cutoff = Utc::now() - ChronoDuration::days(CLEANUP_AGE_DAYS);
    let deleted = db.cleanup_webhook_events_older_than(cutoff).await?;
    if deleted > 0 {
        info!(deleted, "cleaned up old webhook events");
    }
    Ok(deleted)
}

/// Spawns the three periodic sweeps as a single background task running on
/// independent interval ticks, mirroring the select-loop-over-intervals
/// shape used for sync/patrol scheduling elsewhere in this workspace.
pub fn spawn(
    db: std::sync::Arc<SprintforgeDb>,
    sender: flume::Sender<i64>,
    max_attempts: u32,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut retry_interval = tokio::time::interval(std::time::Duration::from_secs(60));
        let mut throughput_interval = tokio::time::interval(std::time::Duration::from_secs(60));
        let mut cleanup_interval = tokio::time::interval(std::time::Duration::from_secs(6 * 3600));

        retry_interval.tick().await;
        throughput_interval.tick().await;
        cleanup_interval.tick().await;

        loop {
            tokio::select! {
                _ = retry_interval.tick() => {
                    if let Err(e) = retry_sweep(&db, &sender, max_attempts as i64).await {
                        warn!(error = %e, "retry sweep failed");
                    }
                }
                _ = throughput_interval.tick() => {
                    if let Err(e) = throughput_monitor(&db).await {
                        warn!(error = %e, "throughput monitor failed");
                    }
                }
                _ = cleanup_interval.tick() => {
                    if let Err(e) = cleanup(&db).await {
                        warn!(error = %e, "cleanup sweep failed");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use sf_core::types::{ProcessingStatus, WebhookEvent};

    /// `insert_webhook_event_idempotent` always inserts a fresh row with
    /// `attempts=0`; these helpers insert then patch via
    /// `update_webhook_event` to simulate a row that already went through
    /// one or more failed processing attempts.
    async fn seed_event(
        db: &SprintforgeDb,
        event_id: &str,
        attempts: i64,
        status: ProcessingStatus,
        received_at: chrono::DateTime<Utc>,
    ) -> i64 {
        let fresh = WebhookEvent {
            id: 0,
            event_id: event_id.into(),
            event_type: "jira:issue_updated".into(),
            payload: json!({}),
            processing_status: ProcessingStatus::Pending,
            attempts: 0,
            last_processed_at: None,
            error: None,
            processed_data: None,
            received_at,
        };
        let (id, _) = db.insert_webhook_event_idempotent(&fresh).await.unwrap();
        let mut updated = fresh;
        updated.id = id;
        updated.attempts = attempts;
        updated.processing_status = status;
        updated.error = Some("boom".into());
        db.update_webhook_event(&updated).await.unwrap();
        id
    }

    #[tokio::test]
    async fn retry_sweep_requeues_only_events_under_the_attempt_cap() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let now = Utc::now();
        let retryable_id = seed_event(&db, "a", 1, ProcessingStatus::Failed, now).await;
        seed_event(&db, "b", 3, ProcessingStatus::Failed, now).await;

        let (tx, rx) = flume::unbounded();
        let count = retry_sweep(&db, &tx, 3).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(rx.try_recv().unwrap(), retryable_id);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn retry_sweep_ignores_events_outside_the_window() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let stale = Utc::now() - Duration::hours(RETRY_WINDOW_HOURS + 1);
        seed_event(&db, "old", 1, ProcessingStatus::Failed, stale).await;

        let (tx, _rx) = flume::unbounded();
        let count = retry_sweep(&db, &tx, 3).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn cleanup_deletes_old_terminal_events_only() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let old = Utc::now() - Duration::days(CLEANUP_AGE_DAYS + 1);
        seed_event(&db, "old-done", 1, ProcessingStatus::Completed, old).await;
        seed_event(&db, "recent", 1, ProcessingStatus::Failed, Utc::now()).await;

        let deleted = cleanup(&db).await.unwrap();
        assert_eq!(deleted, 1);
    }
}
