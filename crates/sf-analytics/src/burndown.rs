//! Burndown/burnup series derived from recorded sprint metrics, falling
//! back to a single live snapshot when no historical samples exist yet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_client::client::TrackerClient;
use sf_core::cancel::CancellationToken;
use sf_core::db::SprintforgeDb;
use sf_core::types::ProjectSprintMetrics;

use crate::aggregate::compute_live_sprint_metrics;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurndownPoint {
    pub date: DateTime<Utc>,
    pub remaining_points: f64,
    pub completed_points: f64,
    pub scope_points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurndownData {
    pub points: Vec<BurndownPoint>,
    pub ideal_remaining_at_end: f64,
    pub is_live_snapshot: bool,
}

/// Builds the burndown/burnup series for one project workstream within a
/// sprint from its recorded `ProjectSprintMetrics` history. If no history
/// has been recorded yet, falls back to a single point built from the
/// caller-supplied live snapshot.
pub fn burndown_from_metrics(history: &[ProjectSprintMetrics], live: Option<&ProjectSprintMetrics>) -> BurndownData {
    if history.is_empty() {
        let points = live
            .map(|m| vec![point_from_metrics(m)])
            .unwrap_or_default();
        return BurndownData { points, ideal_remaining_at_end: 0.0, is_live_snapshot: true };
    }

    let points: Vec<BurndownPoint> = history.iter().map(point_from_metrics).collect();
    BurndownData { points, ideal_remaining_at_end: 0.0, is_live_snapshot: false }
}

fn point_from_metrics(m: &ProjectSprintMetrics) -> BurndownPoint {
    BurndownPoint {
        date: m.metric_date,
        remaining_points: (m.story_points_total - m.story_points_completed).max(0.0),
        completed_points: m.story_points_completed,
        scope_points: m.story_points_total,
    }
}

pub async fn generate_project_burndown_data(
    db: &SprintforgeDb,
    client: &TrackerClient,
    sprint_id: i64,
    project_workstream_id: i64,
    cancel: &CancellationToken,
) -> Result<BurndownData> {
    let history = db.list_metrics_for_sprint_project(sprint_id, project_workstream_id).await?;
    if !history.is_empty() {
        return Ok(burndown_from_metrics(&history, None));
    }

    let live = match (db.get_sprint(sprint_id).await?, db.list_project_workstreams().await?.into_iter().find(|w| w.id == project_workstream_id)) {
        (Some(sprint), Some(workstream)) => {
            Some(compute_live_sprint_metrics(client, db, &sprint, &workstream.project_key, project_workstream_id, cancel).await?)
        }
        _ => None,
    };

    Ok(burndown_from_metrics(&history, live.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metrics_at(days_ago: i64, total: f64, completed: f64) -> ProjectSprintMetrics {
        ProjectSprintMetrics {
            id: 0,
            sprint_id: 1,
            project_workstream_id: 1,
            metric_date: Utc::now() - chrono::Duration::days(days_ago),
            issues_total: 0,
            issues_completed: 0,
            issues_in_progress: 0,
            issues_blocked: 0,
            story_points_total: total,
            story_points_completed: completed,
            completion_percentage: if total > 0.0 { completed / total * 100.0 } else { 0.0 },
            velocity: 0.0,
            burndown_rate: 0.0,
            scope_added: 0,
            scope_removed: 0,
            details: json!({}),
        }
    }

    #[test]
    fn empty_history_without_live_snapshot_yields_no_points() {
        let data = burndown_from_metrics(&[], None);
        assert!(data.points.is_empty());
        assert!(data.is_live_snapshot);
    }

    #[test]
    fn empty_history_falls_back_to_live_snapshot() {
        let live = metrics_at(0, 50.0, 10.0);
        let data = burndown_from_metrics(&[], Some(&live));
        assert_eq!(data.points.len(), 1);
        assert_eq!(data.points[0].remaining_points, 40.0);
        assert!(data.is_live_snapshot);
    }

    #[test]
    fn history_produces_one_point_per_sample() {
        let history = vec![metrics_at(3, 50.0, 0.0), metrics_at(2, 50.0, 10.0), metrics_at(1, 50.0, 25.0)];
        let data = burndown_from_metrics(&history, None);
        assert_eq!(data.points.len(), 3);
        assert!(!data.is_live_snapshot);
        assert_eq!(data.points[2].remaining_points, 25.0);
    }
}
