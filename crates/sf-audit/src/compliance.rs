//! Compliance reporting over a date-range/tag slice of the security log.
//!
//! There is no dedicated `AuditLog` summary table in this schema, so the
//! report itself is persisted as a `SecurityEvent` - category
//! `"compliance"`, the report body in `metadata` - chained into the same
//! hash chain as everything else it summarizes rather than a parallel,
//! unchained table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_core::db::SprintforgeDb;
use sf_core::types::{SecurityEvent, SecuritySeverity};
use std::collections::HashMap;

use crate::checksum::chain_checksum;
use crate::error::Result;
use crate::log::{create_security_event, NewSecurityEvent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub framework_tag: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_events: usize,
    pub counts_by_type: HashMap<String, usize>,
    pub counts_by_category: HashMap<String, usize>,
    pub success_rate: f64,
    pub severity_distribution: HashMap<SecuritySeverity, usize>,
}

fn build_report(framework_tag: &str, from: DateTime<Utc>, to: DateTime<Utc>, events: &[SecurityEvent]) -> ComplianceReport {
    let matching: Vec<&SecurityEvent> =
        events.iter().filter(|e| e.compliance_tags.iter().any(|t| t == framework_tag)).collect();

    let mut counts_by_type = HashMap::new();
    let mut counts_by_category = HashMap::new();
    let mut severity_distribution = HashMap::new();
    let mut successes = 0usize;

    for event in &matching {
        *counts_by_type.entry(event.event_type.clone()).or_insert(0) += 1;
        *counts_by_category.entry(event.category.clone()).or_insert(0) += 1;
        *severity_distribution.entry(event.severity).or_insert(0) += 1;
        if event.success {
            successes += 1;
        }
    }

    let success_rate = if matching.is_empty() { 0.0 } else { successes as f64 / matching.len() as f64 };

    ComplianceReport {
        framework_tag: framework_tag.to_string(),
        from,
        to,
        total_events: matching.len(),
        counts_by_type,
        counts_by_category,
        success_rate,
        severity_distribution,
    }
}

/// Computes a compliance report and persists it as a chained,
/// checksummed security event of its own.
pub async fn generate_compliance_report(
    db: &SprintforgeDb,
    framework_tag: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<(ComplianceReport, SecurityEvent)> {
    let events = db.list_security_events_in_range(from, to).await?;
    let report = build_report(framework_tag, from, to, &events);

    let summary_event = create_security_event(
        db,
        NewSecurityEvent {
            event_type: "compliance.report_generated".into(),
            category: "compliance".into(),
            severity: SecuritySeverity::Info,
            actor: serde_json::json!({"system": "sf-audit"}),
            resource: serde_json::json!({"framework_tag": framework_tag}),
            success: true,
            description: format!("compliance report generated for '{framework_tag}'"),
            metadata: serde_json::to_value(&report).unwrap_or_default(),
            compliance_tags: vec![framework_tag.to_string()],
            retention_days: 2555,
        },
    )
    .await?;

    debug_assert_eq!(summary_event.checksum.as_deref(), Some(chain_checksum(&summary_event).as_str()));
    Ok((report, summary_event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seed(db: &SprintforgeDb, event_type: &str, category: &str, success: bool, tag: &str) {
        create_security_event(
            db,
            NewSecurityEvent {
                event_type: event_type.into(),
                category: category.into(),
                severity: SecuritySeverity::Info,
                actor: json!({}),
                resource: json!({}),
                success,
                description: "x".into(),
                metadata: json!({}),
                compliance_tags: vec![tag.into()],
                retention_days: 365,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn report_only_counts_matching_tag() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        seed(&db, "auth.login", "authentication", true, "soc2").await;
        seed(&db, "auth.login", "authentication", false, "gdpr").await;

        let from = Utc::now() - chrono::Duration::days(1);
        let to = Utc::now() + chrono::Duration::days(1);
        let (report, _) = generate_compliance_report(&db, "soc2", from, to).await.unwrap();

        assert_eq!(report.total_events, 1);
        assert_eq!(report.success_rate, 1.0);
    }

    #[tokio::test]
    async fn report_event_is_chained_after_the_events_it_summarizes() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        seed(&db, "auth.login", "authentication", true, "soc2").await;

        let from = Utc::now() - chrono::Duration::days(1);
        let to = Utc::now() + chrono::Duration::days(1);
        let (_, summary) = generate_compliance_report(&db, "soc2", from, to).await.unwrap();

        let prior = db.get_security_event(1).await.unwrap().unwrap();
        assert_eq!(summary.previous_checksum, prior.checksum);
    }
}
