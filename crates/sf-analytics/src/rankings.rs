//! Multi-criteria project ranking.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankingCriteria {
    Priority,
    Completion,
    RiskScore,
    Velocity,
    CapacityUtilization,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRankingInput {
    pub project_key: String,
    pub priority: i64,
    pub completion_pct: f64,
    pub risk_score: u32,
    pub velocity: f64,
    pub capacity_utilization_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRank {
    pub project_key: String,
    pub rank: usize,
    pub score: f64,
    pub justification: String,
}

/// Scores and sorts projects by the requested criterion. Every criterion
/// sorts descending (best first) except `risk-score`, where lower is
/// better.
pub fn get_project_rankings(
    projects: &[ProjectRankingInput],
    criteria: RankingCriteria,
    limit: usize,
) -> Vec<ProjectRank> {
    let mut scored: Vec<(f64, &ProjectRankingInput)> = projects
        .iter()
        .map(|p| (score_for(p, criteria), p))
        .collect();

    match criteria {
        RankingCriteria::RiskScore => scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap()),
        _ => scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap()),
    }

    scored
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, (score, p))| ProjectRank {
            project_key: p.project_key.clone(),
            rank: idx + 1,
            score,
            justification: justify(criteria, p),
        })
        .collect()
}

fn score_for(p: &ProjectRankingInput, criteria: RankingCriteria) -> f64 {
    match criteria {
        RankingCriteria::Priority => -(p.priority as f64),
        RankingCriteria::Completion => p.completion_pct,
        RankingCriteria::RiskScore => p.risk_score as f64,
        RankingCriteria::Velocity => p.velocity,
        RankingCriteria::CapacityUtilization => p.capacity_utilization_pct,
    }
}

fn justify(criteria: RankingCriteria, p: &ProjectRankingInput) -> String {
    match criteria {
        RankingCriteria::Priority => format!("priority {}", p.priority),
        RankingCriteria::Completion => format!("{:.1}% complete", p.completion_pct),
        RankingCriteria::RiskScore => format!("risk score {}", p.risk_score),
        RankingCriteria::Velocity => format!("velocity {:.1}", p.velocity),
        RankingCriteria::CapacityUtilization => format!("{:.1}% capacity utilization", p.capacity_utilization_pct),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(key: &str, priority: i64, completion: f64, risk: u32, velocity: f64, util: f64) -> ProjectRankingInput {
        ProjectRankingInput {
            project_key: key.into(),
            priority,
            completion_pct: completion,
            risk_score: risk,
            velocity,
            capacity_utilization_pct: util,
        }
    }

    fn sample_projects() -> Vec<ProjectRankingInput> {
        vec![
            project("ALPHA", 1, 80.0, 10, 20.0, 90.0),
            project("BETA", 3, 40.0, 60, 10.0, 140.0),
            project("GAMMA", 2, 95.0, 5, 25.0, 70.0),
        ]
    }

    #[test]
    fn risk_score_sorts_ascending() {
        let ranked = get_project_rankings(&sample_projects(), RankingCriteria::RiskScore, 20);
        assert_eq!(ranked[0].project_key, "GAMMA");
        assert_eq!(ranked.last().unwrap().project_key, "BETA");
    }

    #[test]
    fn completion_sorts_descending() {
        let ranked = get_project_rankings(&sample_projects(), RankingCriteria::Completion, 20);
        assert_eq!(ranked[0].project_key, "GAMMA");
        assert_eq!(ranked.last().unwrap().project_key, "BETA");
    }

    #[test]
    fn priority_favors_lower_numbers() {
        let ranked = get_project_rankings(&sample_projects(), RankingCriteria::Priority, 20);
        assert_eq!(ranked[0].project_key, "ALPHA");
    }

    #[test]
    fn limit_truncates_results() {
        let ranked = get_project_rankings(&sample_projects(), RankingCriteria::Velocity, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
    }
}
