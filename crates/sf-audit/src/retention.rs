//! Retention policy: delete events whose `retention_date` has passed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sf_core::db::SprintforgeDb;
use sf_core::types::SecurityEvent;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionResult {
    pub dry_run: bool,
    pub events: Vec<SecurityEvent>,
}

/// Finds events due for retention. In dry-run mode the rows are only
/// reported; otherwise they are deleted, which breaks chain semantics
/// for everything after the deleted range going forward.
pub async fn apply_retention_policy(db: &SprintforgeDb, dry_run: bool) -> Result<RetentionResult> {
    let events = db.delete_security_events_due_for_retention(Utc::now(), dry_run).await?;
    Ok(RetentionResult { dry_run, events })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{create_security_event, NewSecurityEvent};
    use serde_json::json;
    use sf_core::types::SecuritySeverity;

    fn sample(retention_days: i64) -> NewSecurityEvent {
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
            retention_days,
        }
    }

    #[tokio::test]
    async fn dry_run_reports_without_deleting() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        create_security_event(&db, sample(-1)).await.unwrap();

        let result = apply_retention_policy(&db, true).await.unwrap();
        assert_eq!(result.events.len(), 1);
        assert!(db.get_security_event(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn live_run_deletes_due_events() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        create_security_event(&db, sample(-1)).await.unwrap();
        create_security_event(&db, sample(365)).await.unwrap();

        let result = apply_retention_policy(&db, false).await.unwrap();
        assert_eq!(result.events.len(), 1);
        assert!(db.get_security_event(1).await.unwrap().is_none());
        assert!(db.get_security_event(2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn future_retention_dates_are_left_alone() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        create_security_event(&db, sample(365)).await.unwrap();

        let result = apply_retention_policy(&db, false).await.unwrap();
        assert!(result.events.is_empty());
    }
}
