//! Portfolio-wide rollup across a board's active project associations.
//!
//! Per-project figures come from the last recorded `ProjectSprintMetrics`
//! row for each association, the same store the burndown series reads
//! from - there is no local issue cache to query "tracker-filtered issues"
//! against directly.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sf_core::db::SprintforgeDb;
use sf_core::types::{Sprint, SprintState};

use crate::error::{AnalyticsError, Result};

const BLOCKED_RATIO_CRITICAL: f64 = 0.20;
const BEHIND_GAP_PTS: f64 = 20.0;
const AT_RISK_GAP_PTS: f64 = 8.0;
const AT_RISK_PROJECT_SHARE_CRITICAL: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectHealthStatus {
    OnTrack,
    AtRisk,
    Behind,
    Blocked,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortfolioHealth {
    Healthy,
    AtRisk,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPortfolioEntry {
    pub project_key: String,
    pub project_workstream_id: i64,
    pub completion_pct: f64,
    pub blocked_ratio: f64,
    pub status: ProjectHealthStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthIndicator {
    pub name: String,
    pub value: f64,
    pub target: f64,
    pub status: ProjectHealthStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectPortfolio {
    pub sprint_id: i64,
    pub entries: Vec<ProjectPortfolioEntry>,
    pub on_track: usize,
    pub at_risk: usize,
    pub behind: usize,
    pub blocked: usize,
    pub completed: usize,
    pub overall_completion_pct: f64,
    pub overall_health: PortfolioHealth,
    pub indicators: Vec<HealthIndicator>,
}

/// Classifies one project's health from its completion against the
/// sprint's time-elapsed fraction, and its blocked-issue ratio. Blocked
/// takes precedence; full completion always wins over a timing gap.
pub fn classify_project_health(completion_pct: f64, blocked_ratio: f64, expected_completion_pct: f64) -> ProjectHealthStatus {
    if blocked_ratio > BLOCKED_RATIO_CRITICAL {
        return ProjectHealthStatus::Blocked;
    }
    if completion_pct >= 100.0 {
        return ProjectHealthStatus::Completed;
    }
    let gap = expected_completion_pct - completion_pct;
    if gap > BEHIND_GAP_PTS {
        ProjectHealthStatus::Behind
    } else if gap > AT_RISK_GAP_PTS {
        ProjectHealthStatus::AtRisk
    } else {
        ProjectHealthStatus::OnTrack
    }
}

fn expected_completion_pct(sprint: &Sprint) -> f64 {
    let (Some(start), Some(end)) = (sprint.start_date, sprint.end_date) else {
        return 50.0;
    };
    let total = (end - start).num_seconds().max(1) as f64;
    let elapsed = (Utc::now() - start).num_seconds().max(0) as f64;
    (elapsed / total * 100.0).clamp(0.0, 100.0)
}

fn rollup(entries: &[ProjectPortfolioEntry]) -> ProjectPortfolio {
    let on_track = entries.iter().filter(|e| e.status == ProjectHealthStatus::OnTrack).count();
    let at_risk = entries.iter().filter(|e| e.status == ProjectHealthStatus::AtRisk).count();
    let behind = entries.iter().filter(|e| e.status == ProjectHealthStatus::Behind).count();
    let blocked = entries.iter().filter(|e| e.status == ProjectHealthStatus::Blocked).count();
    let completed = entries.iter().filter(|e| e.status == ProjectHealthStatus::Completed).count();

    let overall_completion_pct = if entries.is_empty() {
        0.0
    } else {
        entries.iter().map(|e| e.completion_pct).sum::<f64>() / entries.len() as f64
    };

    let at_risk_share = if entries.is_empty() {
        0.0
    } else {
        (at_risk + behind + blocked) as f64 / entries.len() as f64
    };
    let overall_health = if at_risk_share >= AT_RISK_PROJECT_SHARE_CRITICAL {
        PortfolioHealth::Critical
    } else if at_risk_share > 0.0 {
        PortfolioHealth::AtRisk
    } else {
        PortfolioHealth::Healthy
    };

    let avg_velocity_status = if overall_health == PortfolioHealth::Healthy {
        ProjectHealthStatus::OnTrack
    } else {
        ProjectHealthStatus::AtRisk
    };

    let indicators = vec![
        HealthIndicator {
            name: "completion".into(),
            value: overall_completion_pct,
            target: 100.0,
            status: if overall_completion_pct >= 90.0 { ProjectHealthStatus::OnTrack } else { ProjectHealthStatus::AtRisk },
        },
        HealthIndicator {
            name: "risk".into(),
            value: at_risk_share * 100.0,
            target: 0.0,
            status: match overall_health {
                PortfolioHealth::Healthy => ProjectHealthStatus::OnTrack,
                PortfolioHealth::AtRisk => ProjectHealthStatus::AtRisk,
                PortfolioHealth::Critical => ProjectHealthStatus::Blocked,
            },
        },
        HealthIndicator {
            name: "velocity".into(),
            value: on_track as f64,
            target: entries.len() as f64,
            status: avg_velocity_status,
        },
    ];

    ProjectPortfolio {
        sprint_id: 0,
        entries: entries.to_vec(),
        on_track,
        at_risk,
        behind,
        blocked,
        completed,
        overall_completion_pct,
        overall_health,
        indicators,
    }
}

/// `get_project_portfolio`: resolves the target sprint, loads active
/// project associations for it, derives per-project health from the
/// latest recorded metrics, and rolls everything up into one summary.
pub async fn get_project_portfolio(
    db: &SprintforgeDb,
    board_id: i64,
    sprint_id: Option<i64>,
) -> Result<ProjectPortfolio> {
    let sprint = resolve_sprint(db, board_id, sprint_id).await?;
    let associations = db.list_associations_for_sprint(sprint.id).await?;
    let expected_pct = expected_completion_pct(&sprint);

    let mut entries = Vec::with_capacity(associations.len());
    for assoc in &associations {
        let mut history = db
            .list_metrics_for_sprint_project(sprint.id, assoc.project_workstream_id)
            .await?;
        let Some(latest) = history.pop() else { continue };

        let blocked_ratio = if latest.issues_total > 0 {
            latest.issues_blocked as f64 / latest.issues_total as f64
        } else {
            0.0
        };

        let status = classify_project_health(latest.completion_percentage, blocked_ratio, expected_pct);
        entries.push(ProjectPortfolioEntry {
            project_key: format!("workstream-{}", assoc.project_workstream_id),
            project_workstream_id: assoc.project_workstream_id,
            completion_pct: latest.completion_percentage,
            blocked_ratio,
            status,
        });
    }

    let mut portfolio = rollup(&entries);
    portfolio.sprint_id = sprint.id;
    Ok(portfolio)
}

async fn resolve_sprint(db: &SprintforgeDb, board_id: i64, sprint_id: Option<i64>) -> Result<Sprint> {
    if let Some(id) = sprint_id {
        return db
            .get_sprint(id)
            .await?
            .ok_or_else(|| AnalyticsError::Validation(format!("sprint {id} not found")));
    }

    let sprints = db.list_sprints_by_board(board_id).await?;
    sprints
        .into_iter()
        .filter(|s| s.state == SprintState::Active)
        .max_by_key(|s| s.start_date)
        .ok_or_else(|| AnalyticsError::Validation(format!("no active sprint for board {board_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_takes_precedence_over_completion() {
        assert_eq!(classify_project_health(100.0, 0.5, 50.0), ProjectHealthStatus::Blocked);
    }

    #[test]
    fn full_completion_without_blockers_is_completed() {
        assert_eq!(classify_project_health(100.0, 0.0, 50.0), ProjectHealthStatus::Completed);
    }

    #[test]
    fn large_gap_to_expected_is_behind() {
        assert_eq!(classify_project_health(20.0, 0.0, 60.0), ProjectHealthStatus::Behind);
    }

    #[test]
    fn small_gap_is_at_risk() {
        assert_eq!(classify_project_health(45.0, 0.0, 55.0), ProjectHealthStatus::AtRisk);
    }

    #[test]
    fn on_pace_is_on_track() {
        assert_eq!(classify_project_health(50.0, 0.0, 50.0), ProjectHealthStatus::OnTrack);
    }

    #[test]
    fn portfolio_with_enough_at_risk_projects_is_critical() {
        let entries = vec![
            ProjectPortfolioEntry { project_key: "a".into(), project_workstream_id: 1, completion_pct: 10.0, blocked_ratio: 0.0, status: ProjectHealthStatus::Behind },
            ProjectPortfolioEntry { project_key: "b".into(), project_workstream_id: 2, completion_pct: 10.0, blocked_ratio: 0.0, status: ProjectHealthStatus::Behind },
            ProjectPortfolioEntry { project_key: "c".into(), project_workstream_id: 3, completion_pct: 90.0, blocked_ratio: 0.0, status: ProjectHealthStatus::OnTrack },
        ];
        let portfolio = rollup(&entries);
        assert_eq!(portfolio.overall_health, PortfolioHealth::Critical);
    }

    #[test]
    fn portfolio_with_no_risk_is_healthy() {
        let entries = vec![
            ProjectPortfolioEntry { project_key: "a".into(), project_workstream_id: 1, completion_pct: 90.0, blocked_ratio: 0.0, status: ProjectHealthStatus::OnTrack },
        ];
        let portfolio = rollup(&entries);
        assert_eq!(portfolio.overall_health, PortfolioHealth::Healthy);
    }
}
