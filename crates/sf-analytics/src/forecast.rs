//! Monte Carlo completion forecasting from historical velocity.

use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::velocity::VelocityHistory;

const DEFAULT_ITERATIONS: usize = 10_000;
const MIN_SAMPLED_VELOCITY: f64 = 0.1;
const RISK_MULTIPLIER: f64 = 1.5;
const HIGH_RISK_THRESHOLD: f64 = 0.30;
const MEDIUM_RISK_THRESHOLD: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionForecast {
    pub iterations: usize,
    pub mean_days: f64,
    pub p50_days: f64,
    pub p80_days: f64,
    pub p95_days: f64,
    pub risk_of_overrun: f64,
    pub risk_level: RiskLevel,
}

/// Runs a Monte Carlo simulation of days-to-completion given a remaining
/// work total and the project's historical per-day (or per-sprint-unit)
/// velocity distribution. `rng_seed` makes forecasts reproducible in tests;
/// pass a fresh seed (e.g. derived from the current time) in production.
pub fn monte_carlo_completion_forecast(
    history: &VelocityHistory,
    remaining_work: f64,
    iterations: usize,
    rng_seed: u64,
) -> Result<CompletionForecast> {
    if history.mean <= 0.0 {
        return Err(AnalyticsError::InsufficientHistory("forecast".into()));
    }
    if remaining_work < 0.0 {
        return Err(AnalyticsError::Validation("remaining work cannot be negative".into()));
    }

    let iterations = if iterations == 0 { DEFAULT_ITERATIONS } else { iterations };
    let std_dev = history.std_dev.max(history.mean * 0.01);
    let normal = Normal::new(history.mean, std_dev)
        .map_err(|e| AnalyticsError::Validation(format!("invalid velocity distribution: {e}")))?;
    let mut rng = rand::rngs::StdRng::seed_from_u64(rng_seed);

    let mut days_samples: Vec<f64> = (0..iterations)
        .map(|_| {
            let sampled_velocity = normal.sample(&mut rng).max(MIN_SAMPLED_VELOCITY);
            remaining_work / sampled_velocity
        })
        .collect();
    days_samples.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mean_days = days_samples.iter().sum::<f64>() / days_samples.len() as f64;
    let p50_days = percentile(&days_samples, 0.50);
    let p80_days = percentile(&days_samples, 0.80);
    let p95_days = percentile(&days_samples, 0.95);

    let overrun_threshold = mean_days * RISK_MULTIPLIER;
    let overrun_count = days_samples.iter().filter(|&&d| d > overrun_threshold).count();
    let risk_of_overrun = overrun_count as f64 / days_samples.len() as f64;

    let risk_level = if risk_of_overrun > HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if risk_of_overrun > MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    Ok(CompletionForecast { iterations, mean_days, p50_days, p80_days, p95_days, risk_of_overrun, risk_level })
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::velocity::VelocityTrend;

    fn history(mean: f64, std_dev: f64) -> VelocityHistory {
        VelocityHistory { samples: 6, mean, std_dev, consistency: 90.0, trend: VelocityTrend::Stable, velocities: vec![] }
    }

    #[test]
    fn rejects_zero_mean_velocity() {
        assert!(monte_carlo_completion_forecast(&history(0.0, 1.0), 100.0, 1000, 1).is_err());
    }

    #[test]
    fn percentiles_are_monotonic() {
        let f = monte_carlo_completion_forecast(&history(20.0, 4.0), 100.0, 5000, 42).unwrap();
        assert!(f.p50_days <= f.p80_days);
        assert!(f.p80_days <= f.p95_days);
        assert!(f.mean_days > 0.0);
    }

    #[test]
    fn high_variance_history_increases_overrun_risk() {
        let steady = monte_carlo_completion_forecast(&history(20.0, 1.0), 100.0, 5000, 7).unwrap();
        let volatile = monte_carlo_completion_forecast(&history(20.0, 15.0), 100.0, 5000, 7).unwrap();
        assert!(volatile.risk_of_overrun >= steady.risk_of_overrun);
    }

    #[test]
    fn same_seed_is_reproducible() {
        let a = monte_carlo_completion_forecast(&history(20.0, 4.0), 100.0, 2000, 99).unwrap();
        let b = monte_carlo_completion_forecast(&history(20.0, 4.0), 100.0, 2000, 99).unwrap();
        assert_eq!(a.mean_days, b.mean_days);
    }
}
