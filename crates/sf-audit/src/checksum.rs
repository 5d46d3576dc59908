//! Canonical event hashing used to chain-link the security event log.
//!
//! `serde_json::Value`'s default (non-`preserve_order`) map type already
//! serializes keys alphabetically, so building the canonical object as a
//! `json!` literal and re-serializing it gives a stable byte representation
//! without a separate key-sorting pass.

use serde_json::json;
use sha2::{Digest, Sha256};
use sf_core::types::SecurityEvent;

/// Hashes every field of `event` except `checksum` itself.
pub fn chain_checksum(event: &SecurityEvent) -> String {
    let canonical = json!({
        "id": event.id,
        "event_type": event.event_type,
        "category": event.category,
        "severity": event.severity,
        "actor": event.actor,
        "resource": event.resource,
        "success": event.success,
        "description": event.description,
        "metadata": event.metadata,
        "compliance_tags": event.compliance_tags,
        "correlation_id": event.correlation_id,
        "previous_checksum": event.previous_checksum,
        "retention_date": event.retention_date.to_rfc3339(),
        "created_at": event.created_at.to_rfc3339(),
    });
    let bytes = serde_json::to_string(&canonical).unwrap_or_default();
    let digest = Sha256::digest(bytes.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json as j;
    use sf_core::types::SecuritySeverity;
    use uuid::Uuid;

    fn sample() -> SecurityEvent {
        SecurityEvent {
            id: 1,
            event_type: "auth.login".into(),
            category: "authentication".into(),
            severity: SecuritySeverity::Info,
            actor: j!({"user_id": "bob"}),
            resource: j!({"ip": "10.0.0.1"}),
            success: true,
            description: "login succeeded".into(),
            metadata: j!({}),
            compliance_tags: vec!["soc2".into()],
            correlation_id: Uuid::nil(),
            checksum: None,
            previous_checksum: None,
            retention_date: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn is_deterministic_for_identical_events() {
        let event = sample();
        assert_eq!(chain_checksum(&event), chain_checksum(&event));
    }

    #[test]
    fn changes_when_any_field_changes() {
        let a = sample();
        let mut b = sample();
        b.success = false;
        assert_ne!(chain_checksum(&a), chain_checksum(&b));
    }

    #[test]
    fn is_independent_of_the_checksum_field_itself() {
        let mut a = sample();
        let mut b = sample();
        a.checksum = None;
        b.checksum = Some("irrelevant".into());
        assert_eq!(chain_checksum(&a), chain_checksum(&b));
    }
}
