//! Convenience wrappers over `create_security_event` for the four event
//! families spec'd out explicitly: authentication, authorization,
//! data-access, and violations.

use serde_json::Value;
use sf_core::db::SprintforgeDb;
use sf_core::types::{SecurityEvent, SecuritySeverity};

use crate::error::Result;
use crate::log::{create_security_event, NewSecurityEvent};

const DEFAULT_RETENTION_DAYS: i64 = 365;
const VIOLATION_RETENTION_DAYS: i64 = 2555;

pub async fn record_authentication_event(
    db: &SprintforgeDb,
    action: &str,
    actor: Value,
    success: bool,
    description: impl Into<String>,
) -> Result<SecurityEvent> {
    create_security_event(
        db,
        NewSecurityEvent {
            event_type: format!("authentication.{action}"),
            category: "authentication".into(),
            severity: if success { SecuritySeverity::Info } else { SecuritySeverity::Medium },
            actor,
            resource: Value::Null,
            success,
            description: description.into(),
            metadata: Value::Null,
            compliance_tags: vec![],
            retention_days: DEFAULT_RETENTION_DAYS,
        },
    )
    .await
}

pub async fn record_authorization_event(
    db: &SprintforgeDb,
    actor: Value,
    resource: Value,
    permission: &str,
    granted: bool,
) -> Result<SecurityEvent> {
    create_security_event(
        db,
        NewSecurityEvent {
            event_type: "authorization.check".into(),
            category: "authorization".into(),
            severity: if granted { SecuritySeverity::Info } else { SecuritySeverity::Medium },
            actor,
            resource,
            success: granted,
            description: format!("permission '{permission}' {}", if granted { "granted" } else { "denied" }),
            metadata: Value::Null,
            compliance_tags: vec![],
            retention_days: DEFAULT_RETENTION_DAYS,
        },
    )
    .await
}

pub async fn record_data_access_event(
    db: &SprintforgeDb,
    actor: Value,
    resource: Value,
    action: &str,
) -> Result<SecurityEvent> {
    create_security_event(
        db,
        NewSecurityEvent {
            event_type: format!("data_access.{action}"),
            category: "data_access".into(),
            severity: SecuritySeverity::Info,
            actor,
            resource,
            success: true,
            description: format!("data access: {action}"),
            metadata: Value::Null,
            compliance_tags: vec![],
            retention_days: DEFAULT_RETENTION_DAYS,
        },
    )
    .await
}

pub async fn record_security_violation(
    db: &SprintforgeDb,
    actor: Value,
    resource: Value,
    description: impl Into<String>,
) -> Result<SecurityEvent> {
    create_security_event(
        db,
        NewSecurityEvent {
            event_type: "security.violation".into(),
            category: "violation".into(),
            severity: SecuritySeverity::Critical,
            actor,
            resource,
            success: false,
            description: description.into(),
            metadata: Value::Null,
            compliance_tags: vec![],
            retention_days: VIOLATION_RETENTION_DAYS,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn failed_authentication_is_recorded_as_a_warning() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let event =
            record_authentication_event(&db, "login", json!({"user_id": "bob"}), false, "bad password").await.unwrap();
        assert_eq!(event.severity, SecuritySeverity::Medium);
        assert!(!event.success);
    }

    #[tokio::test]
    async fn denied_authorization_is_recorded_as_unsuccessful() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let event =
            record_authorization_event(&db, json!({"user_id": "bob"}), json!({"path": "/admin"}), "admin.access", false)
                .await
                .unwrap();
        assert!(!event.success);
        assert_eq!(event.category, "authorization");
    }

    #[tokio::test]
    async fn violations_get_the_long_retention_window() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let event = record_security_violation(&db, json!({}), json!({}), "tamper detected").await.unwrap();
        assert_eq!(event.severity, SecuritySeverity::Critical);
        let days = (event.retention_date - event.created_at).num_days();
        assert_eq!(days, VIOLATION_RETENTION_DAYS);
    }
}
