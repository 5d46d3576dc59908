//! Weighted-factor project risk scoring.

use serde::{Deserialize, Serialize};

use crate::forecast::RiskLevel;
use crate::velocity::{VelocityHistory, VelocityTrend};

const VELOCITY_CONSISTENCY_THRESHOLD: f64 = 50.0;
const CAPACITY_OVER_ALLOCATION_PCT: f64 = 120.0;
const CAPACITY_UNDER_UTILIZATION_PCT: f64 = 60.0;
const COMPLETION_LAG_THRESHOLD_PTS: f64 = 20.0;
const BLOCKED_RATIO_CRITICAL: f64 = 0.20;

const SCORE_CRITICAL: u32 = 60;
const SCORE_HIGH: u32 = 35;
const SCORE_MEDIUM: u32 = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub score: u32,
    pub level: RiskLevel,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub factors: Vec<RiskFactor>,
    pub overall_score: u32,
    pub overall_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskInputs {
    pub capacity_utilization_pct: Option<f64>,
    pub planned_completion_pct: Option<f64>,
    pub actual_completion_pct: Option<f64>,
    pub blocked_issue_ratio: Option<f64>,
    pub any_blocked: bool,
}

/// Scores a project's risk from its velocity history plus whatever
/// capacity/completion/blocked-issue signals are available for the sprint
/// in progress. Each present factor contributes independently; the overall
/// score is their sum, bucketed into a level.
pub fn assess_project_risks(velocity: &VelocityHistory, inputs: &RiskInputs) -> RiskAssessment {
    let mut factors = Vec::new();

    if velocity.consistency < VELOCITY_CONSISTENCY_THRESHOLD {
        factors.push(RiskFactor {
            name: "velocity_consistency".into(),
            score: 20,
            level: RiskLevel::Medium,
            detail: format!("velocity consistency {:.1} below threshold", velocity.consistency),
        });
    }

    if velocity.trend == VelocityTrend::Declining {
        factors.push(RiskFactor {
            name: "velocity_trend".into(),
            score: 30,
            level: RiskLevel::High,
            detail: "velocity trend is declining".into(),
        });
    }

    if let Some(util) = inputs.capacity_utilization_pct {
        if util > CAPACITY_OVER_ALLOCATION_PCT {
            factors.push(RiskFactor {
                name: "capacity_over_allocation".into(),
                score: 35,
                level: RiskLevel::High,
                detail: format!("capacity utilization {util:.1}% exceeds over-allocation threshold"),
            });
        } else if util < CAPACITY_UNDER_UTILIZATION_PCT {
            factors.push(RiskFactor {
                name: "capacity_under_utilization".into(),
                score: 10,
                level: RiskLevel::Low,
                detail: format!("capacity utilization {util:.1}% below under-utilization threshold"),
            });
        }
    }

    if let (Some(planned), Some(actual)) = (inputs.planned_completion_pct, inputs.actual_completion_pct) {
        let lag = planned - actual;
        if lag > COMPLETION_LAG_THRESHOLD_PTS {
            factors.push(RiskFactor {
                name: "completion_lag".into(),
                score: 25,
                level: RiskLevel::High,
                detail: format!("actual completion trails plan by {lag:.1} points"),
            });
        }
    }

    if let Some(blocked_ratio) = inputs.blocked_issue_ratio {
        if blocked_ratio > BLOCKED_RATIO_CRITICAL {
            factors.push(RiskFactor {
                name: "blocked_issues".into(),
                score: 40,
                level: RiskLevel::Critical,
                detail: format!("{:.0}% of issues are blocked", blocked_ratio * 100.0),
            });
        } else if inputs.any_blocked {
            factors.push(RiskFactor {
                name: "blocked_issues".into(),
                score: 15,
                level: RiskLevel::Medium,
                detail: "at least one issue is blocked".into(),
            });
        }
    }

    let overall_score: u32 = factors.iter().map(|f| f.score).sum();
    let overall_level = if overall_score >= SCORE_CRITICAL {
        RiskLevel::Critical
    } else if overall_score >= SCORE_HIGH {
        RiskLevel::High
    } else if overall_score >= SCORE_MEDIUM {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    RiskAssessment { factors, overall_score, overall_level }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stable_history() -> VelocityHistory {
        VelocityHistory { samples: 6, mean: 20.0, std_dev: 2.0, consistency: 90.0, trend: VelocityTrend::Stable, velocities: vec![] }
    }

    #[test]
    fn clean_project_has_no_risk_factors() {
        let assessment = assess_project_risks(&stable_history(), &RiskInputs::default());
        assert!(assessment.factors.is_empty());
        assert_eq!(assessment.overall_level, RiskLevel::Low);
    }

    #[test]
    fn heavy_blocking_dominates_the_score() {
        let inputs = RiskInputs { blocked_issue_ratio: Some(0.5), ..Default::default() };
        let assessment = assess_project_risks(&stable_history(), &inputs);
        assert_eq!(assessment.overall_score, 40);
        assert_eq!(assessment.overall_level, RiskLevel::High);
    }

    #[test]
    fn combined_factors_escalate_to_critical() {
        let declining = VelocityHistory { trend: VelocityTrend::Declining, consistency: 30.0, ..stable_history() };
        let inputs = RiskInputs {
            capacity_utilization_pct: Some(130.0),
            ..Default::default()
        };
        let assessment = assess_project_risks(&declining, &inputs);
        assert!(assessment.overall_score >= SCORE_CRITICAL);
        assert_eq!(assessment.overall_level, RiskLevel::Critical);
    }

    #[test]
    fn under_utilization_is_low_severity() {
        let inputs = RiskInputs { capacity_utilization_pct: Some(40.0), ..Default::default() };
        let assessment = assess_project_risks(&stable_history(), &inputs);
        assert_eq!(assessment.overall_score, 10);
        assert_eq!(assessment.overall_level, RiskLevel::Low);
    }
}
