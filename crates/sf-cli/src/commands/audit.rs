use anyhow::Context;
use chrono::{DateTime, Utc};
use sf_audit::{compliance, verify};

use super::{load_config, open_db};

/// Walks the security event chain and reports whether every checksum
/// links correctly to its predecessor.
pub async fn verify_chain(json_output: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let db = open_db(&config).await?;

    let report = verify::verify_chain_integrity(&db).await.context("chain verification failed")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("audit chain verification");
        println!("  events checked:  {}", report.events_checked);
        println!("  broken links:    {}", report.broken_links.len());
        for link in &report.broken_links {
            println!(
                "    event {}: expected previous checksum {:?}, found {:?}",
                link.event_id, link.expected_previous_checksum, link.actual_previous_checksum
            );
        }
    }

    if !report.is_intact() {
        anyhow::bail!("audit chain has {} broken link(s)", report.broken_links.len());
    }
    Ok(())
}

/// Generates and persists a compliance report for events tagged with
/// `framework_tag` in `[from, to]`.
pub async fn report(framework_tag: &str, from: DateTime<Utc>, to: DateTime<Utc>, json_output: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let db = open_db(&config).await?;

    let (report, event) = compliance::generate_compliance_report(&db, framework_tag, from, to)
        .await
        .context("failed to generate compliance report")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("compliance report for '{framework_tag}' ({from} .. {to})");
        println!("  total events:    {}", report.total_events);
        println!("  success rate:    {:.1}%", report.success_rate * 100.0);
        for (category, count) in &report.counts_by_category {
            println!("    {category}: {count}");
        }
        println!("  recorded as security event #{}", event.id);
    }

    Ok(())
}
