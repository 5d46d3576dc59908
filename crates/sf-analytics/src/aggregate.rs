//! Live issue aggregation: fetches a sprint's current issues from the
//! tracker and folds them into the `ProjectSprintMetrics` shape the rest
//! of the analytics engine consumes, so velocity/burndown have something
//! to report before a sync batch has ever persisted a metrics row.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sf_client::client::TrackerClient;
use sf_core::cancel::CancellationToken;
use sf_core::db::SprintforgeDb;
use sf_core::types::{ProjectSprintMetrics, Sprint, SprintState};
use sf_mapper::apply_field_mappings;

use crate::error::Result;

/// Name of the field mapping template consulted for the story-points
/// custom field. Falls back to the conventional Jira field id below when
/// no such template has been configured yet.
const DEFAULT_TEMPLATE_NAME: &str = "jira-default";
const FALLBACK_STORY_POINTS_FIELD: &str = "customfield_10016";
const DONE_STATUS_NAMES: [&str; 3] = ["done", "closed", "resolved"];

/// Fetches `sprint`'s issues live, scoped to `project_key`, and aggregates
/// them into a metrics row. Story points are resolved through the active
/// field mapping template when one exists; status is read directly off
/// the tracker's `fields.status.name`, which is structurally stable across
/// Jira Cloud/Server and needs no per-instance mapping.
pub async fn compute_live_sprint_metrics(
    client: &TrackerClient,
    db: &SprintforgeDb,
    sprint: &Sprint,
    project_key: &str,
    project_workstream_id: i64,
    cancel: &CancellationToken,
) -> Result<ProjectSprintMetrics> {
    let jql_filter = format!("project = {project_key}");
    let issues = client
        .get_sprint_issues(sprint.tracker_sprint_id, true, Some(&jql_filter), cancel)
        .await?;

    let mappings = match db.get_field_mapping_template_by_name(DEFAULT_TEMPLATE_NAME).await? {
        Some(template) => db.list_active_mappings_for_template(template.id).await?,
        None => Vec::new(),
    };

    let mut story_points_total = 0.0;
    let mut story_points_completed = 0.0;
    let mut issues_completed: i64 = 0;

    for issue in &issues {
        let wrapped = serde_json::json!({ "fields": issue.fields });
        let canonical = apply_field_mappings(&wrapped, &mappings);
        let points = canonical
            .get("story_points")
            .and_then(Value::as_f64)
            .or_else(|| issue.fields.get(FALLBACK_STORY_POINTS_FIELD).and_then(Value::as_f64))
            .unwrap_or(0.0);
        story_points_total += points;

        if is_done(&issue.fields) {
            story_points_completed += points;
            issues_completed += 1;
        }
    }

    let now = Utc::now();
    let duration_days = sprint_duration_days(sprint, now);
    let velocity = story_points_completed / duration_days;
    let completion_percentage = if story_points_total > 0.0 {
        story_points_completed / story_points_total * 100.0
    } else {
        0.0
    };

    Ok(ProjectSprintMetrics {
        id: 0,
        sprint_id: sprint.id,
        project_workstream_id,
        metric_date: now,
        issues_total: issues.len() as i64,
        issues_completed,
        issues_in_progress: issues.len() as i64 - issues_completed,
        issues_blocked: 0,
        story_points_total,
        story_points_completed,
        completion_percentage,
        velocity,
        burndown_rate: 0.0,
        scope_added: 0,
        scope_removed: 0,
        details: serde_json::json!({}),
    })
}

fn is_done(fields: &Value) -> bool {
    fields
        .get("status")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .map(|name| DONE_STATUS_NAMES.contains(&name.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// `max(1, end - start)` for a finished sprint, `now - start` while active.
fn sprint_duration_days(sprint: &Sprint, now: DateTime<Utc>) -> f64 {
    let start = sprint.start_date.unwrap_or(now);
    let end = match sprint.state {
        SprintState::Active => now,
        _ => sprint.end_date.unwrap_or(now),
    };
    ((end - start).num_seconds() as f64 / 86_400.0).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprint(state: SprintState, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Sprint {
        Sprint {
            id: 1,
            tracker_sprint_id: 100,
            name: "Sprint 1".into(),
            state,
            goal: None,
            start_date: Some(start),
            end_date: end,
            complete_date: None,
            board_id: 1,
            tracker_last_modified: None,
            sync_status: sf_core::types::SyncStatus::Completed,
            tracker_board_name: None,
            tracker_project_key: None,
            tracker_api_version: None,
        }
    }

    #[test]
    fn is_done_matches_known_status_names_case_insensitively() {
        assert!(is_done(&serde_json::json!({"status": {"name": "Done"}})));
        assert!(is_done(&serde_json::json!({"status": {"name": "RESOLVED"}})));
        assert!(!is_done(&serde_json::json!({"status": {"name": "In Progress"}})));
        assert!(!is_done(&serde_json::json!({})));
    }

    #[test]
    fn duration_uses_elapsed_time_for_active_sprints() {
        let now = Utc::now();
        let start = now - chrono::Duration::days(4);
        let s = sprint(SprintState::Active, start, None);
        let days = sprint_duration_days(&s, now);
        assert!((days - 4.0).abs() < 0.01);
    }

    #[test]
    fn duration_floors_at_one_day() {
        let now = Utc::now();
        let s = sprint(SprintState::Closed, now, Some(now));
        assert_eq!(sprint_duration_days(&s, now), 1.0);
    }
}
