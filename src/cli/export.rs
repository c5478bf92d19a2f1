//! Export command implementation

use crate::clob::ClobClient;
use crate::config::Config;
use crate::export::ExportFormat;
use crate::market::GammaClient;
use crate::processor::{MarketProcessor, RunSummary};
use crate::tracker::ProcessedItemTracker;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Search pattern for market discovery
    #[arg(short, long)]
    pub search: Option<String>,

    /// Tag slug filter
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<ExportFormat>,

    /// Minimum delay between history requests (milliseconds)
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Forget processed markets before running
    #[arg(long)]
    pub reset_cache: bool,
}

impl ExportArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(search) = &self.search {
            config.discovery.search = Some(search.clone());
        }
        if let Some(tag) = &self.tag {
            config.discovery.tag = Some(tag.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.export.output_dir = dir.clone();
        }
        if let Some(format) = self.format {
            config.export.format = format;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.rate_limit.delay_ms = delay_ms;
        }
    }

    pub async fn execute(&self, config: &Config) -> anyhow::Result<RunSummary> {
        let mut config = config.clone();
        self.apply(&mut config);
        config.validate()?;

        let discovery =
            GammaClient::with_config(config.gamma_config()).context("Failed to build Gamma client")?;
        let prices =
            ClobClient::with_config(config.clob_config()).context("Failed to build CLOB client")?;

        let tracker = open_tracker(config.tracker_path(), self.reset_cache);

        let processor = MarketProcessor::new(
            Arc::new(discovery),
            Arc::new(prices),
            Arc::new(tracker),
            Arc::new(config.rate_limiter()),
            config.exporter(),
            config.processor_config(),
        );

        let summary = processor.run().await.context("Export run failed")?;
        print_summary(&summary);
        Ok(summary)
    }
}

fn print_summary(summary: &RunSummary) {
    println!("Markets discovered: {}", summary.discovered);
    println!("Markets matched:    {}", summary.matched);
    println!("Markets selected:   {}", summary.selected);
    println!("Processed:          {}", summary.processed);
    println!("Skipped (cached):   {}", summary.skipped);
    println!("Errors:             {}", summary.errors);
    match &summary.output_path {
        Some(path) => println!(
            "Wrote {} records to {}",
            summary.records_written,
            path.display()
        ),
        None => println!("No new records, no file written"),
    }
}

/// Open the marker file, emptying it first when `reset` is set
fn open_tracker(path: PathBuf, reset: bool) -> ProcessedItemTracker {
    let tracker = ProcessedItemTracker::open(path);
    if reset {
        tracing::info!(path = %tracker.path().display(), count = tracker.count(), "Clearing processed markets");
        tracker.clear();
    }
    tracker
}
