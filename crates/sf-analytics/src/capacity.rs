//! Capacity distribution and allocation-conflict classification.

use serde::{Deserialize, Serialize};
use sf_core::db::SprintforgeDb;
use sf_core::types::{DisciplineTeamCapacity, ProjectCapacityAllocation};

use crate::error::Result;

const OVER_ALLOCATION_PCT: f64 = 110.0;
const OVER_ALLOCATION_HIGH_PCT: f64 = 150.0;
const UNDER_UTILIZATION_PCT: f64 = 50.0;
const HIGH_PRIORITY_MAX: i64 = 2;
const HIGH_PRIORITY_SHARE_MIN: f64 = 20.0;
const LOW_PRIORITY_MIN: i64 = 5;
const LOW_PRIORITY_SHARE_MAX: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityConflictKind {
    OverAllocation,
    UnderUtilization,
    PriorityMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityConflict {
    pub team_name: String,
    pub kind: CapacityConflictKind,
    pub severity: ConflictSeverity,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamCapacitySummary {
    pub team_name: String,
    pub capacity_points: f64,
    pub allocated: f64,
    pub available: f64,
    pub utilization_pct: f64,
    pub over_capacity: bool,
    pub per_project: Vec<ProjectAllocationShare>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAllocationShare {
    pub project_workstream_id: i64,
    pub priority: i64,
    pub allocated: f64,
    pub capacity_share_pct: f64,
}

/// Sums active allocations per discipline team for a sprint and attaches
/// each team's per-project capacity share.
pub fn analyze_capacity_distribution(
    capacities: &[DisciplineTeamCapacity],
    allocations: &[ProjectCapacityAllocation],
) -> Vec<TeamCapacitySummary> {
    capacities
        .iter()
        .map(|c| {
            let per_project: Vec<ProjectAllocationShare> = allocations
                .iter()
                .filter(|a| a.team_capacity_id == c.id)
                .map(|a| ProjectAllocationShare {
                    project_workstream_id: a.project_workstream_id,
                    priority: a.priority,
                    allocated: a.allocated,
                    capacity_share_pct: capacity_share(a.allocated, c.capacity_points),
                })
                .collect();

            TeamCapacitySummary {
                team_name: c.team_name.clone(),
                capacity_points: c.capacity_points,
                allocated: c.allocated,
                available: c.remaining(),
                utilization_pct: c.utilization_percentage(),
                over_capacity: c.utilization_percentage() > 100.0,
                per_project,
            }
        })
        .collect()
}

fn capacity_share(allocated: f64, capacity_points: f64) -> f64 {
    if capacity_points <= 0.0 {
        0.0
    } else {
        (allocated / capacity_points) * 100.0
    }
}

/// Classifies each team's allocation state per the over/under-allocation
/// and priority-mismatch rules.
pub fn classify_capacity_conflicts(summaries: &[TeamCapacitySummary]) -> Vec<CapacityConflict> {
    let mut conflicts = Vec::new();

    for team in summaries {
        if team.utilization_pct > OVER_ALLOCATION_PCT {
            let severity = if team.utilization_pct > OVER_ALLOCATION_HIGH_PCT {
                ConflictSeverity::High
            } else {
                ConflictSeverity::Medium
            };
            conflicts.push(CapacityConflict {
                team_name: team.team_name.clone(),
                kind: CapacityConflictKind::OverAllocation,
                severity,
                detail: format!("{} allocated at {:.1}% of capacity", team.team_name, team.utilization_pct),
            });
        } else if team.utilization_pct < UNDER_UTILIZATION_PCT {
            conflicts.push(CapacityConflict {
                team_name: team.team_name.clone(),
                kind: CapacityConflictKind::UnderUtilization,
                severity: ConflictSeverity::Low,
                detail: format!("{} allocated at only {:.1}% of capacity", team.team_name, team.utilization_pct),
            });
        }

        for project in &team.per_project {
            let mismatch = (project.priority <= HIGH_PRIORITY_MAX && project.capacity_share_pct < HIGH_PRIORITY_SHARE_MIN)
                || (project.priority >= LOW_PRIORITY_MIN && project.capacity_share_pct > LOW_PRIORITY_SHARE_MAX);
            if mismatch {
                conflicts.push(CapacityConflict {
                    team_name: team.team_name.clone(),
                    kind: CapacityConflictKind::PriorityMismatch,
                    severity: ConflictSeverity::Medium,
                    detail: format!(
                        "project {} (priority {}) holds {:.1}% of {}'s capacity",
                        project.project_workstream_id, project.priority, project.capacity_share_pct, team.team_name
                    ),
                });
            }
        }
    }

    conflicts
}

pub async fn load_capacity_distribution(
    db: &SprintforgeDb,
    sprint_id: i64,
) -> Result<(Vec<TeamCapacitySummary>, Vec<CapacityConflict>)> {
    let capacities = db.list_capacities_for_sprint(sprint_id).await?;
    let allocations = db.list_allocations_for_sprint(sprint_id).await?;
    let summaries = analyze_capacity_distribution(&capacities, &allocations);
    let conflicts = classify_capacity_conflicts(&summaries);
    Ok((summaries, conflicts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::types::{CapacityTrend, CapacityType};

    fn team(id: i64, name: &str, capacity: f64, allocated: f64) -> DisciplineTeamCapacity {
        DisciplineTeamCapacity {
            id,
            sprint_id: 1,
            team_name: name.into(),
            capacity_points: capacity,
            capacity_type: CapacityType::StoryPoints,
            allocated,
            notes: None,
        }
    }

    fn allocation(team_capacity_id: i64, project_workstream_id: i64, priority: i64, allocated: f64) -> ProjectCapacityAllocation {
        ProjectCapacityAllocation {
            id: 0,
            sprint_id: 1,
            project_workstream_id,
            team_capacity_id,
            allocated,
            utilized: allocated,
            remaining: 0.0,
            priority,
            trend: CapacityTrend::Stable,
        }
    }

    #[test]
    fn flags_over_allocated_team_as_high_above_150() {
        let summaries = analyze_capacity_distribution(&[team(1, "backend", 20.0, 35.0)], &[]);
        let conflicts = classify_capacity_conflicts(&summaries);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, CapacityConflictKind::OverAllocation);
        assert_eq!(conflicts[0].severity, ConflictSeverity::High);
    }

    #[test]
    fn flags_over_allocated_team_as_medium_below_150() {
        let summaries = analyze_capacity_distribution(&[team(1, "backend", 20.0, 23.0)], &[]);
        let conflicts = classify_capacity_conflicts(&summaries);
        assert_eq!(conflicts[0].severity, ConflictSeverity::Medium);
    }

    #[test]
    fn flags_under_utilized_team() {
        let summaries = analyze_capacity_distribution(&[team(1, "qa", 20.0, 5.0)], &[]);
        let conflicts = classify_capacity_conflicts(&summaries);
        assert_eq!(conflicts[0].kind, CapacityConflictKind::UnderUtilization);
    }

    #[test]
    fn balanced_team_has_no_conflicts() {
        let summaries = analyze_capacity_distribution(&[team(1, "frontend", 20.0, 15.0)], &[]);
        assert!(classify_capacity_conflicts(&summaries).is_empty());
    }

    #[test]
    fn high_priority_project_with_small_share_is_a_mismatch() {
        let summaries = analyze_capacity_distribution(
            &[team(1, "backend", 100.0, 50.0)],
            &[allocation(1, 1, 1, 10.0)],
        );
        let conflicts = classify_capacity_conflicts(&summaries);
        assert!(conflicts.iter().any(|c| c.kind == CapacityConflictKind::PriorityMismatch));
    }

    #[test]
    fn low_priority_project_with_large_share_is_a_mismatch() {
        let summaries = analyze_capacity_distribution(
            &[team(1, "backend", 100.0, 50.0)],
            &[allocation(1, 1, 5, 45.0)],
        );
        let conflicts = classify_capacity_conflicts(&summaries);
        assert!(conflicts.iter().any(|c| c.kind == CapacityConflictKind::PriorityMismatch));
    }
}
