//! Append-only security event log: each new row's checksum covers its own
//! fields plus the previous row's checksum, chaining the whole table.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sf_core::db::SprintforgeDb;
use sf_core::types::{SecurityEvent, SecuritySeverity};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::checksum::chain_checksum;
use crate::error::{AuditError, Result};

/// Serializes chain-append across concurrent callers in this process so two
/// writers can never read the same tail checksum and link two sibling
/// events as if they were sequential.
static CHAIN_LOCK: Mutex<()> = Mutex::const_new(());

#[derive(Debug, Clone)]
pub struct NewSecurityEvent {
    pub event_type: String,
    pub category: String,
    pub severity: SecuritySeverity,
    pub actor: Value,
    pub resource: Value,
    pub success: bool,
    pub description: String,
    pub metadata: Value,
    pub compliance_tags: Vec<String>,
    pub retention_days: i64,
}

/// Builds the row, links it to the prior event's checksum, persists it
/// without a checksum, computes the checksum over the persisted fields,
/// then writes it back. Steps 3-6 of the append algorithm; the caller
/// supplies step 1's content via `NewSecurityEvent`.
pub async fn create_security_event(db: &SprintforgeDb, new_event: NewSecurityEvent) -> Result<SecurityEvent> {
    let _chain_guard = CHAIN_LOCK.lock().await;

    let now = Utc::now();
    let previous_checksum = db.latest_security_event().await?.and_then(|e| e.checksum);

    let mut event = SecurityEvent {
        id: 0,
        event_type: new_event.event_type,
        category: new_event.category,
        severity: new_event.severity,
        actor: new_event.actor,
        resource: new_event.resource,
        success: new_event.success,
        description: new_event.description,
        metadata: new_event.metadata,
        compliance_tags: new_event.compliance_tags,
        correlation_id: Uuid::new_v4(),
        checksum: None,
        previous_checksum,
        retention_date: now + Duration::days(new_event.retention_days),
        created_at: now,
    };

    let id = db.insert_security_event_pending(&event).await?;
    event.id = id;

    let checksum = chain_checksum(&event);
    db.set_security_event_checksum(id, checksum.clone()).await?;
    event.checksum = Some(checksum);

    Ok(event)
}

pub async fn get_security_event(db: &SprintforgeDb, id: i64) -> Result<SecurityEvent> {
    db.get_security_event(id).await?.ok_or(AuditError::NotFound(id))
}

pub async fn list_security_events_in_range(
    db: &SprintforgeDb,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<SecurityEvent>> {
    Ok(db.list_security_events_in_range(from, to).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(event_type: &str) -> NewSecurityEvent {
        NewSecurityEvent {
            event_type: event_type.into(),
            category: "authentication".into(),
            severity: SecuritySeverity::Info,
            actor: json!({"user_id": "bob"}),
            resource: json!({}),
            success: true,
            description: "ok".into(),
            metadata: json!({}),
            compliance_tags: vec![],
            retention_days: 365,
        }
    }

    #[tokio::test]
    async fn first_event_has_no_previous_checksum() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let event = create_security_event(&db, sample("auth.login")).await.unwrap();
        assert!(event.previous_checksum.is_none());
        assert!(event.checksum.is_some());
    }

    #[tokio::test]
    async fn second_event_links_to_the_first() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let first = create_security_event(&db, sample("auth.login")).await.unwrap();
        let second = create_security_event(&db, sample("auth.logout")).await.unwrap();
        assert_eq!(second.previous_checksum, first.checksum);
    }

    #[tokio::test]
    async fn retention_date_is_derived_from_retention_days() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let event = create_security_event(&db, sample("auth.login")).await.unwrap();
        let expected = event.created_at + Duration::days(365);
        assert_eq!(event.retention_date.date_naive(), expected.date_naive());
    }
}
