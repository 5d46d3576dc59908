//! `Ingest(eventID, eventType, payload) -> Accepted | Duplicate | Rejected`.

use chrono::Utc;
use serde_json::{json, Value};
use sf_audit::events::record_security_violation;
use sf_core::db::SprintforgeDb;
use sf_core::types::{ProcessingStatus, WebhookEvent};

use crate::error::Result;
use crate::signature;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Accepted(i64),
    Duplicate(i64),
    Rejected(String),
}

/// Validates the signature header (if a shared secret is configured), then
/// persists the event idempotently on `event_id`. Queueing is the caller's
/// job - see [`crate::worker::WorkerPool::enqueue`] - so a durable row
/// always exists even if the enqueue step is never reached.
pub async fn ingest(
    db: &SprintforgeDb,
    shared_secret: Option<&[u8]>,
    event_id: &str,
    event_type: &str,
    payload: Value,
    raw_body: &[u8],
    signature_header: Option<&str>,
) -> Result<IngestOutcome> {
    if let Some(secret) = shared_secret {
        let valid = signature_header.is_some_and(|h| signature::verify(secret, raw_body, h));
        if !valid {
            record_security_violation(
                db,
                json!({ "kind": "external_webhook" }),
                json!({ "event_id": event_id, "event_type": event_type }),
                format!("webhook event '{event_id}' failed signature verification"),
            )
            .await?;
            return Ok(IngestOutcome::Rejected("signature mismatch".into()));
        }
    }

    let event = WebhookEvent {
        id: 0,
        event_id: event_id.to_string(),
        event_type: event_type.to_string(),
        payload,
        processing_status: ProcessingStatus::Pending,
        attempts: 0,
        last_processed_at: None,
        error: None,
        processed_data: None,
        received_at: Utc::now(),
    };

    let (id, inserted) = db.insert_webhook_event_idempotent(&event).await?;
    Ok(if inserted {
        IngestOutcome::Accepted(id)
    } else {
        IngestOutcome::Duplicate(id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn accepts_a_new_event_and_is_idempotent_on_retry() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let first = ingest(&db, None, "evt-1", "jira:issue_updated", json!({"a": 1}), b"{}", None)
            .await
            .unwrap();
        assert!(matches!(first, IngestOutcome::Accepted(_)));

        let second = ingest(&db, None, "evt-1", "jira:issue_updated", json!({"a": 1}), b"{}", None)
            .await
            .unwrap();
        assert!(matches!(second, IngestOutcome::Duplicate(_)));
    }

    #[tokio::test]
    async fn rejects_when_signature_required_but_missing() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let outcome = ingest(&db, Some(b"secret"), "evt-2", "jira:sprint_started", json!({}), b"{}", None)
            .await
            .unwrap();
        assert!(matches!(outcome, IngestOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn accepts_a_correctly_signed_event() {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;
        let body = b"{\"k\":1}";
        let mut mac = Hmac::<Sha256>::new_from_slice(b"secret").unwrap();
        mac.update(body);
        let hex: String = mac.finalize().into_bytes().iter().map(|b| format!("{b:02x}")).collect();
        let header = format!("sha256={hex}");

        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let outcome = ingest(
            &db,
            Some(b"secret"),
            "evt-3",
            "jira:issue_created",
            json!({"k": 1}),
            body,
            Some(&header),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, IngestOutcome::Accepted(_)));
    }
}
