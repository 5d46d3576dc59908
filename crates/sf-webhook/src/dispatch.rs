//! Per-event processing dispatched by event-type prefix.
//!
//! There is no local `Issue` entity in this schema - sprints, boards, and
//! projects are the only tracker-mirrored tables - so `issue*` events can't
//! "locate local entities that reference the issue key" the way the sprint
//! path updates a real row. Instead the canonical, mapped fields are
//! persisted onto the event's own `processed_data` column so a downstream
//! consumer (or a future local issue cache) can read them back.

use serde_json::Value;
use sf_client::dto::SprintDTO;
use sf_core::cancel::CancellationToken;
use sf_core::db::SprintforgeDb;
use sf_core::types::{Sprint, SprintState, WebhookEvent};
use sf_sync::{dto_to_domain, SyncEngine};
use tracing::info;

use crate::error::{Result, WebhookError};

const DEFAULT_ISSUE_MAPPING_TEMPLATE: &str = "issue";

fn event_kind(event_type: &str) -> &str {
    event_type.split_once(':').map(|(_, rest)| rest).unwrap_or(event_type)
}

fn is_issue_event(event_type: &str) -> bool {
    event_kind(event_type).starts_with("issue")
}

fn is_sprint_event(event_type: &str) -> bool {
    event_kind(event_type).starts_with("sprint")
}

/// Runs the dispatch step of processing for one event. Returns the
/// `processed_data` to store on success.
pub async fn dispatch(db: &SprintforgeDb, sync: &SyncEngine, event: &WebhookEvent) -> Result<Option<Value>> {
    if is_issue_event(&event.event_type) {
        dispatch_issue(db, event).await
    } else if is_sprint_event(&event.event_type) {
        dispatch_sprint(db, sync, event).await
    } else {
        info!(event_type = %event.event_type, "webhook event type has no registered dispatcher, accepting as a no-op");
        Ok(None)
    }
}

async fn dispatch_issue(db: &SprintforgeDb, event: &WebhookEvent) -> Result<Option<Value>> {
    let template = db
        .get_field_mapping_template_by_name(DEFAULT_ISSUE_MAPPING_TEMPLATE)
        .await?;
    let Some(template) = template else {
        return Err(WebhookError::Validation(format!(
            "no field mapping template named '{DEFAULT_ISSUE_MAPPING_TEMPLATE}'"
        )));
    };
    let mappings = db.list_active_mappings_for_template(template.id).await?;
    let canonical = sf_mapper::apply_field_mappings(&event.payload, &mappings);
    Ok(Some(canonical))
}

async fn dispatch_sprint(db: &SprintforgeDb, sync: &SyncEngine, event: &WebhookEvent) -> Result<Option<Value>> {
    let raw = event.payload.get("sprint").unwrap_or(&event.payload);
    let dto: SprintDTO = serde_json::from_value(raw.clone())
        .map_err(|e| WebhookError::Validation(format!("malformed sprint payload: {e}")))?;

    let previous_state = db
        .get_sprint_by_tracker_id(dto.id)
        .await?
        .map(|s| s.state);

    let sprint: Sprint = dto_to_domain(&dto);
    db.upsert_sprint(&sprint).await?;

    if transitioned_to_active_or_closed(previous_state, sprint.state) {
        info!(tracker_sprint_id = sprint.tracker_sprint_id, board_id = sprint.board_id, "sprint state transition observed, enqueuing per-sprint sync");
        let _ = sync
            .sync_sprints_bidirectional(Some(sprint.board_id), true, None, &CancellationToken::new())
            .await?;
    }

    Ok(Some(serde_json::to_value(&sprint).unwrap_or(Value::Null)))
}

fn transitioned_to_active_or_closed(previous: Option<SprintState>, current: SprintState) -> bool {
    matches!(current, SprintState::Active | SprintState::Closed) && previous != Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_issue_and_sprint_prefixes() {
        assert!(is_issue_event("jira:issue_updated"));
        assert!(is_issue_event("jira:issue_created"));
        assert!(!is_issue_event("jira:sprint_started"));
        assert!(is_sprint_event("jira:sprint_closed"));
        assert!(!is_sprint_event("jira:board_updated"));
    }

    #[test]
    fn transition_detection_fires_only_on_state_change_into_active_or_closed() {
        assert!(transitioned_to_active_or_closed(Some(SprintState::Future), SprintState::Active));
        assert!(!transitioned_to_active_or_closed(Some(SprintState::Active), SprintState::Active));
        assert!(!transitioned_to_active_or_closed(None, SprintState::Future));
        assert!(transitioned_to_active_or_closed(None, SprintState::Closed));
    }
}
