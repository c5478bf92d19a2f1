use anyhow::Context;
use clap::Parser;
use poly_history::cli::{Cli, Commands};
use poly_history::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config errors abort before any network activity
    let config = Config::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    poly_history::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command.unwrap_or_default() {
        Commands::Export(args) => {
            tracing::info!("Starting history export");
            args.execute(&config).await?;
        }
        Commands::Lookup(args) => {
            tracing::info!(input = %args.input, "Starting event lookup");
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Gamma API: {}", config.api.gamma_url);
            println!("  CLOB API: {}", config.api.clob_url);
            println!(
                "  Discovery: search={:?} tag={:?} closed={} archived={} page_size={}",
                config.discovery.search,
                config.discovery.tag,
                config.discovery.closed,
                config.discovery.archived,
                config.discovery.page_size
            );
            println!(
                "  History: fidelity={} max_attempts={} initial_backoff={}ms",
                config.history.fidelity,
                config.history.max_attempts,
                config.history.initial_backoff_ms
            );
            println!("  Rate limit: {}ms", config.rate_limit.delay_ms);
            println!("  Target outcome: {}", config.selection.target_outcome);
            println!(
                "  Export: {} ({})",
                config.exporter().file_path(chrono::Utc::now()).display(),
                config.export.format
            );
            println!("  Cache: {}", config.tracker_path().display());
        }
    }

    Ok(())
}
