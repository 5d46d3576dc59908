//! Historical velocity and trend analysis over a project's completed sprints.

use serde::{Deserialize, Serialize};
use sf_client::client::TrackerClient;
use sf_core::cancel::CancellationToken;
use sf_core::db::SprintforgeDb;
use sf_core::types::{ProjectSprintMetrics, SprintState};

use crate::aggregate::compute_live_sprint_metrics;
use crate::error::{AnalyticsError, Result};

const TREND_WINDOW: usize = 3;
const TREND_THRESHOLD_PCT: f64 = 0.10;
const DEFAULT_SPRINT_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityTrend {
    Improving,
    Declining,
    Stable,
    /// No closed-sprint history to derive a trend from - not an error, just
    /// an empty result.
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityHistory {
    pub samples: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub consistency: f64,
    pub trend: VelocityTrend,
    pub velocities: Vec<f64>,
}

/// Derives mean/stddev/consistency/trend from the project's closed-sprint
/// velocity history, most recent last. A project with no closed-sprint
/// history yields `VelocityTrend::Unknown` and empty samples rather than
/// an error - there is simply nothing to report yet.
pub fn velocity_with_history(metrics: &[ProjectSprintMetrics]) -> Result<VelocityHistory> {
    if metrics.is_empty() {
        return Ok(VelocityHistory {
            samples: 0,
            mean: 0.0,
            std_dev: 0.0,
            consistency: 0.0,
            trend: VelocityTrend::Unknown,
            velocities: Vec::new(),
        });
    }

    let velocities: Vec<f64> = metrics.iter().map(|m| m.velocity).collect();
    let mean = mean(&velocities);
    let std_dev = std_dev(&velocities, mean);
    let consistency = if mean > 0.0 {
        (100.0 - (std_dev / mean) * 100.0).max(0.0)
    } else {
        0.0
    };

    let trend = trend_from_window(&velocities);

    Ok(VelocityHistory { samples: velocities.len(), mean, std_dev, consistency, trend, velocities })
}

fn trend_from_window(velocities: &[f64]) -> VelocityTrend {
    if velocities.len() < TREND_WINDOW * 2 {
        return VelocityTrend::Stable;
    }
    let first = mean(&velocities[..TREND_WINDOW]);
    let last = mean(&velocities[velocities.len() - TREND_WINDOW..]);
    if first == 0.0 {
        return VelocityTrend::Stable;
    }
    let delta = (last - first) / first;
    if delta > TREND_THRESHOLD_PCT {
        VelocityTrend::Improving
    } else if delta < -TREND_THRESHOLD_PCT {
        VelocityTrend::Declining
    } else {
        VelocityTrend::Stable
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Loads a project's last `sprint_count` closed sprints (plus the active
/// one when `include_current` is set), newest first, and for each fetches
/// its live issues through the tracker client to derive a fresh
/// `ProjectSprintMetrics` row - persisting it alongside whatever a prior
/// sync batch already recorded - before folding them into a velocity
/// history oldest-to-newest.
pub async fn calculate_project_velocity_with_history(
    db: &SprintforgeDb,
    client: &TrackerClient,
    project_key: &str,
    sprint_count: usize,
    include_current: bool,
    cancel: &CancellationToken,
) -> Result<VelocityHistory> {
    let workstream = db.get_project_workstream_by_key(project_key).await?;
    let Some(workstream) = workstream else {
        return Err(AnalyticsError::Validation(format!("unknown project '{project_key}'")));
    };

    let mut states = vec![SprintState::Closed];
    if include_current {
        states.push(SprintState::Active);
    }
    let mut sprints = db.list_sprints_by_project(project_key, Some(states)).await?;
    let take = if sprint_count == 0 { DEFAULT_SPRINT_COUNT } else { sprint_count };
    sprints.truncate(take);

    let mut metrics = Vec::with_capacity(sprints.len());
    for sprint in sprints.iter().rev() {
        let live = compute_live_sprint_metrics(client, db, sprint, project_key, workstream.id, cancel).await?;
        db.insert_project_sprint_metrics(&live).await?;
        metrics.push(live);
    }

    velocity_with_history(&metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(velocity: f64) -> ProjectSprintMetrics {
        ProjectSprintMetrics {
            id: 0,
            sprint_id: 0,
            project_workstream_id: 0,
            metric_date: chrono::Utc::now(),
            issues_total: 0,
            issues_completed: 0,
            issues_in_progress: 0,
            issues_blocked: 0,
            story_points_total: 0.0,
            story_points_completed: 0.0,
            completion_percentage: 0.0,
            velocity,
            burndown_rate: 0.0,
            scope_added: 0,
            scope_removed: 0,
            details: json!({}),
        }
    }

    #[test]
    fn empty_history_yields_unknown_trend_not_an_error() {
        let h = velocity_with_history(&[]).unwrap();
        assert_eq!(h.trend, VelocityTrend::Unknown);
        assert!(h.velocities.is_empty());
        assert_eq!(h.samples, 0);
    }

    #[test]
    fn computes_mean_and_consistency() {
        let metrics: Vec<_> = [20.0, 22.0, 18.0, 21.0].into_iter().map(sample).collect();
        let h = velocity_with_history(&metrics).unwrap();
        assert!((h.mean - 20.25).abs() < 1e-9);
        assert!(h.consistency > 0.0 && h.consistency <= 100.0);
    }

    #[test]
    fn detects_declining_trend() {
        let metrics: Vec<_> = [30.0, 29.0, 31.0, 15.0, 14.0, 16.0].into_iter().map(sample).collect();
        let h = velocity_with_history(&metrics).unwrap();
        assert_eq!(h.trend, VelocityTrend::Declining);
    }

    #[test]
    fn detects_improving_trend() {
        let metrics: Vec<_> = [10.0, 11.0, 9.0, 20.0, 21.0, 19.0].into_iter().map(sample).collect();
        let h = velocity_with_history(&metrics).unwrap();
        assert_eq!(h.trend, VelocityTrend::Improving);
    }

    #[test]
    fn short_history_is_stable_by_default() {
        let metrics: Vec<_> = [10.0, 40.0].into_iter().map(sample).collect();
        let h = velocity_with_history(&metrics).unwrap();
        assert_eq!(h.trend, VelocityTrend::Stable);
    }
}
