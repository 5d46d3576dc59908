use sf_harness::rate_limiter::{RateLimitConfig, RateLimiter};

use super::load_config;

/// Reports the configured token-bucket budget for the tracker client.
///
/// The bucket itself lives inside the running daemon's `TrackerClient`, not
/// in any shared state this process can see, so this shows the budget a
/// freshly-started client would have rather than its live remaining tokens.
pub fn inspect(json_output: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let rl_config = RateLimitConfig::from_window(config.rate_limit.calls_per_window, config.rate_limit.window_secs);
    let limiter = RateLimiter::new(rl_config.clone());
    let remaining = limiter.remaining("tracker");

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "calls_per_window": config.rate_limit.calls_per_window,
                "window_secs": config.rate_limit.window_secs,
                "tokens_per_second": rl_config.tokens_per_second,
                "max_burst": rl_config.max_burst,
                "fresh_bucket_remaining": remaining,
                "max_retries": config.rate_limit.max_retries,
                "retry_base_secs": config.rate_limit.retry_base_secs,
            }))?
        );
    } else {
        println!("rate limiter configuration (fresh bucket, not the daemon's live state)");
        println!("  calls per window:    {} / {}s", config.rate_limit.calls_per_window, config.rate_limit.window_secs);
        println!("  tokens per second:   {:.2}", rl_config.tokens_per_second);
        println!("  max burst:           {:.0}", rl_config.max_burst);
        println!("  max retries:         {}", config.rate_limit.max_retries);
        println!("  retry base:          {}s", config.rate_limit.retry_base_secs);
    }

    Ok(())
}
