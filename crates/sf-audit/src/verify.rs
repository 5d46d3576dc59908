//! Chain-integrity verification: walk the log and confirm every row's
//! checksum is correct and links to its predecessor.

use serde::{Deserialize, Serialize};
use sf_core::db::SprintforgeDb;
use sf_core::types::SecurityEvent;

use crate::checksum::chain_checksum;
use crate::error::{AuditError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokenLink {
    pub event_id: i64,
    pub expected_previous_checksum: Option<String>,
    pub actual_previous_checksum: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainIntegrityReport {
    pub events_checked: usize,
    pub broken_links: Vec<BrokenLink>,
}

impl ChainIntegrityReport {
    pub fn is_intact(&self) -> bool {
        self.broken_links.is_empty()
    }
}

/// Walks every event by ascending id and confirms each one's
/// `previous_checksum` matches the prior event's `checksum`.
pub fn verify_chain(events: &[SecurityEvent]) -> ChainIntegrityReport {
    let mut broken_links = Vec::new();
    let mut prior_checksum: Option<String> = None;

    for event in events {
        if event.previous_checksum != prior_checksum {
            broken_links.push(BrokenLink {
                event_id: event.id,
                expected_previous_checksum: prior_checksum.clone(),
                actual_previous_checksum: event.previous_checksum.clone(),
            });
        }
        prior_checksum = event.checksum.clone();
    }

    ChainIntegrityReport { events_checked: events.len(), broken_links }
}

pub async fn verify_chain_integrity(db: &SprintforgeDb) -> Result<ChainIntegrityReport> {
    let events = db.list_security_events_asc().await?;
    Ok(verify_chain(&events))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventVerdict {
    Valid,
    ChecksumMismatch,
    DanglingPreviousChecksum,
}

/// Recomputes one event's checksum and checks that its `previous_checksum`
/// resolves to an event actually present in the log.
pub fn verify_event(event: &SecurityEvent, previous_checksums: &[String]) -> EventVerdict {
    let recomputed = chain_checksum(event);
    if event.checksum.as_deref() != Some(recomputed.as_str()) {
        return EventVerdict::ChecksumMismatch;
    }
    if let Some(prev) = &event.previous_checksum {
        if !previous_checksums.iter().any(|c| c == prev) {
            return EventVerdict::DanglingPreviousChecksum;
        }
    }
    EventVerdict::Valid
}

pub async fn verify_event_by_id(db: &SprintforgeDb, id: i64) -> Result<EventVerdict> {
    let event = db.get_security_event(id).await?.ok_or(AuditError::NotFound(id))?;
    let all = db.list_security_events_asc().await?;
    let checksums: Vec<String> = all.iter().filter_map(|e| e.checksum.clone()).collect();
    Ok(verify_event(&event, &checksums))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{create_security_event, NewSecurityEvent};
    use serde_json::json;
    use sf_core::types::SecuritySeverity;

    fn sample() -> NewSecurityEvent {
        NewSecurityEvent {
            event_type: "auth.login".into(),
            category: "authentication".into(),
            severity: SecuritySeverity::Info,
            actor: json!({}),
            resource: json!({}),
            success: true,
            description: "ok".into(),
            metadata: json!({}),
            compliance_tags: vec![],
            retention_days: 365,
        }
    }

    #[tokio::test]
    async fn an_untouched_chain_is_intact() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        create_security_event(&db, sample()).await.unwrap();
        create_security_event(&db, sample()).await.unwrap();
        create_security_event(&db, sample()).await.unwrap();

        let report = verify_chain_integrity(&db).await.unwrap();
        assert!(report.is_intact());
        assert_eq!(report.events_checked, 3);
    }

    #[tokio::test]
    async fn a_tampered_checksum_breaks_the_next_link() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        create_security_event(&db, sample()).await.unwrap();
        create_security_event(&db, sample()).await.unwrap();

        db.set_security_event_checksum(1, "tampered".into()).await.unwrap();

        let report = verify_chain_integrity(&db).await.unwrap();
        assert!(!report.is_intact());
        assert_eq!(report.broken_links[0].event_id, 2);
    }

    #[tokio::test]
    async fn per_event_verify_detects_the_tampered_row_itself() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        create_security_event(&db, sample()).await.unwrap();
        db.set_security_event_checksum(1, "tampered".into()).await.unwrap();

        let verdict = verify_event_by_id(&db, 1).await.unwrap();
        assert_eq!(verdict, EventVerdict::ChecksumMismatch);
    }
}
