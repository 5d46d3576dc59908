use anyhow::Context;
use rand::Rng;
use sf_analytics::forecast::monte_carlo_completion_forecast;
use sf_analytics::velocity::calculate_project_velocity_with_history;
use sf_client::client::TrackerClient;
use sf_core::cancel::CancellationToken;

use super::{load_config, open_db};

/// Computes a project's historical velocity and runs a Monte Carlo
/// completion forecast for the given remaining work.
pub async fn run(project_key: &str, remaining_work: f64, iterations: usize, json_output: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let db = open_db(&config).await?;
    let client = TrackerClient::new(&config.tracker, &config.rate_limit).context("failed to build tracker client")?;
    let cancel = CancellationToken::new();

    let history = calculate_project_velocity_with_history(&db, &client, project_key, 5, true, &cancel)
        .await
        .with_context(|| format!("failed to compute velocity history for project '{project_key}'"))?;

    let seed = rand::thread_rng().gen::<u64>();
    let forecast = monte_carlo_completion_forecast(&history, remaining_work, iterations, seed)
        .context("forecast simulation failed")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({
            "velocity": history,
            "forecast": forecast,
        }))?);
    } else {
        println!("completion forecast for '{project_key}'");
        println!("  velocity mean:       {:.2} (consistency {:.1}%, {:?})", history.mean, history.consistency, history.trend);
        println!("  iterations:          {}", forecast.iterations);
        println!("  p50 days:            {:.1}", forecast.p50_days);
        println!("  p80 days:            {:.1}", forecast.p80_days);
        println!("  p95 days:            {:.1}", forecast.p95_days);
        println!("  risk of overrun:     {:.1}% ({:?})", forecast.risk_of_overrun * 100.0, forecast.risk_level);
    }

    Ok(())
}
