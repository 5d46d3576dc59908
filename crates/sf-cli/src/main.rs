mod commands;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// sprintforge operator CLI -- one-shot operations against the local
/// database, for use alongside or instead of the `sf-daemon` background
/// process.
#[derive(Parser)]
#[command(name = "sf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single sync batch across every accessible board.
    Sync {
        /// Skip entities whose content hash is unchanged since the last sync.
        #[arg(long, default_value_t = true)]
        incremental: bool,
        /// Output JSON.
        #[arg(short = 'j', long, default_value_t = false)]
        json: bool,
    },

    /// Compute a Monte Carlo completion forecast from historical velocity.
    Forecast {
        /// Project key to forecast.
        #[arg(short = 'p', long)]
        project: String,
        /// Remaining work, in the same units as historical velocity.
        #[arg(short = 'r', long)]
        remaining: f64,
        /// Number of Monte Carlo iterations (0 uses the built-in default).
        #[arg(short = 'n', long, default_value_t = 0)]
        iterations: usize,
        /// Output JSON.
        #[arg(short = 'j', long, default_value_t = false)]
        json: bool,
    },

    /// Audit log operations.
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },

    /// Rate limiter operations.
    RateLimit {
        #[command(subcommand)]
        command: RateLimitCommands,
    },
}

#[derive(Subcommand)]
enum AuditCommands {
    /// Verify the hash-chain integrity of the security event log.
    Verify {
        /// Output JSON.
        #[arg(short = 'j', long, default_value_t = false)]
        json: bool,
    },
    /// Generate and persist a compliance report for a tag and date range.
    Report {
        /// Compliance framework tag to filter on (e.g. "soc2", "gdpr").
        #[arg(short = 't', long)]
        tag: String,
        /// Start of the range (RFC 3339).
        #[arg(long)]
        from: DateTime<Utc>,
        /// End of the range (RFC 3339).
        #[arg(long)]
        to: DateTime<Utc>,
        /// Output JSON.
        #[arg(short = 'j', long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RateLimitCommands {
    /// Show the configured token-bucket budget.
    Inspect {
        /// Output JSON.
        #[arg(short = 'j', long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync { incremental, json } => commands::sync::run(incremental, json).await,
        Commands::Forecast { project, remaining, iterations, json } => {
            commands::forecast::run(&project, remaining, iterations, json).await
        }
        Commands::Audit { command } => match command {
            AuditCommands::Verify { json } => commands::audit::verify_chain(json).await,
            AuditCommands::Report { tag, from, to, json } => commands::audit::report(&tag, from, to, json).await,
        },
        Commands::RateLimit { command } => match command {
            RateLimitCommands::Inspect { json } => commands::rate_limit::inspect(json),
        },
    }
}
