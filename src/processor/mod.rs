//! Export pipeline
//!
//! One pass per run: discover markets, filter them by pattern, select the
//! target outcome token, fetch history for tokens not yet processed, and
//! write everything collected in a single sorted export.
//!
//! Records are buffered until the end of the run. An interrupted run marks
//! the instruments it fetched as processed but writes no file, so those
//! records never reach an export.

mod lookup;

pub use lookup::{EventLookup, EventQuotes, LookupError, OutcomeQuote};

use crate::clob::PriceSource;
use crate::export::{sort_records, ExportError, Exporter, OutputRecord};
use crate::http::ApiError;
use crate::market::{normalize_search, MarketDescriptor, MarketDiscovery};
use crate::rate_limit::RateLimiter;
use crate::telemetry::{increment_counter, RunCounter};
use crate::tracker::ProcessedItemTracker;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome exported when none is configured
pub const DEFAULT_TARGET_OUTCOME: &str = "Yes";

/// Pipeline errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("market discovery failed: {0}")]
    Discovery(#[source] ApiError),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

/// Selection settings for a run
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Pattern a market's question or slug must contain; `None` keeps all
    pub search: Option<String>,
    /// Outcome label whose token is fetched
    pub target_outcome: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            search: None,
            target_outcome: DEFAULT_TARGET_OUTCOME.to_string(),
        }
    }
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Markets returned by discovery
    pub discovered: usize,
    /// Markets passing the pattern and outcome/token checks
    pub matched: usize,
    /// Markets with a token for the target outcome
    pub selected: usize,
    /// Tokens fetched successfully this run
    pub processed: usize,
    /// Tokens skipped as already processed
    pub skipped: usize,
    /// Tokens whose fetch failed
    pub errors: usize,
    /// Records in the export file
    pub records_written: usize,
    /// Export file, if one was written
    pub output_path: Option<PathBuf>,
}

/// A market paired with the token chosen for export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedMarket {
    pub question: String,
    pub token_id: String,
}

/// Runs the discovery → fetch → export pipeline
pub struct MarketProcessor {
    discovery: Arc<dyn MarketDiscovery>,
    prices: Arc<dyn PriceSource>,
    tracker: Arc<ProcessedItemTracker>,
    rate_limiter: Arc<RateLimiter>,
    exporter: Exporter,
    config: ProcessorConfig,
}

impl MarketProcessor {
    pub fn new(
        discovery: Arc<dyn MarketDiscovery>,
        prices: Arc<dyn PriceSource>,
        tracker: Arc<ProcessedItemTracker>,
        rate_limiter: Arc<RateLimiter>,
        exporter: Exporter,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            discovery,
            prices,
            tracker,
            rate_limiter,
            exporter,
            config,
        }
    }

    pub fn tracker(&self) -> &ProcessedItemTracker {
        &self.tracker
    }

    /// Execute one full run.
    ///
    /// Only discovery failures and export failures are returned as errors.
    /// Per-token fetch failures are counted in the summary and the token is
    /// left unprocessed for the next run.
    pub async fn run(&self) -> Result<RunSummary, ProcessorError> {
        let mut summary = RunSummary::default();

        tracing::info!(search = ?self.config.search, "Discovering markets");
        let markets = self
            .discovery
            .discover_markets()
            .await
            .map_err(ProcessorError::Discovery)?;

        summary.discovered = markets.len();
        increment_counter(RunCounter::MarketsDiscovered, markets.len() as u64);

        if markets.is_empty() {
            tracing::info!("No markets discovered, nothing to export");
            return Ok(summary);
        }

        let matched = self.filter_markets(&markets);
        summary.matched = matched.len();

        let selected = self.select_tokens(&matched);
        summary.selected = selected.len();

        if selected.is_empty() {
            tracing::info!(
                discovered = summary.discovered,
                matched = summary.matched,
                target_outcome = %self.config.target_outcome,
                "No markets with a target outcome token, nothing to export"
            );
            return Ok(summary);
        }

        let records = self.fetch_all(&selected, &mut summary).await;
        self.export(records, &mut summary)?;

        tracing::info!(
            discovered = summary.discovered,
            matched = summary.matched,
            selected = summary.selected,
            processed = summary.processed,
            skipped = summary.skipped,
            errors = summary.errors,
            records = summary.records_written,
            "Run complete"
        );

        Ok(summary)
    }

    /// Keep markets matching the search pattern with consistent outcome data
    pub fn filter_markets<'a>(&self, markets: &'a [MarketDescriptor]) -> Vec<&'a MarketDescriptor> {
        markets
            .iter()
            .filter(|m| matches_pattern(m, self.config.search.as_deref()))
            .filter(|m| match m.validate() {
                Ok(()) => true,
                Err(reason) => {
                    tracing::warn!(question = %m.question, %reason, "Skipping malformed market");
                    false
                }
            })
            .collect()
    }

    /// Pick the target outcome token for each market
    pub fn select_tokens(&self, markets: &[&MarketDescriptor]) -> Vec<SelectedMarket> {
        let target = self.config.target_outcome.as_str();

        markets
            .iter()
            .filter_map(|m| match m.token_for_outcome(target) {
                Some(token_id) => Some(SelectedMarket {
                    question: m.question.clone(),
                    token_id: token_id.to_string(),
                }),
                None => {
                    tracing::warn!(
                        question = %m.question,
                        outcomes = ?m.outcomes,
                        target,
                        "Market has no target outcome"
                    );
                    None
                }
            })
            .collect()
    }

    async fn fetch_all(
        &self,
        selected: &[SelectedMarket],
        summary: &mut RunSummary,
    ) -> Vec<OutputRecord> {
        let total = selected.len();
        let mut records = Vec::new();

        for (i, market) in selected.iter().enumerate() {
            if self.tracker.is_processed(&market.token_id) {
                summary.skipped += 1;
                increment_counter(RunCounter::MarketsSkipped, 1);
                tracing::debug!(token_id = %market.token_id, "Already processed, skipping");
                continue;
            }

            self.rate_limiter.wait().await;

            match self.prices.price_history(&market.token_id).await {
                Ok(points) => {
                    let before = records.len();
                    records.extend(
                        points
                            .iter()
                            .filter_map(|p| OutputRecord::from_price_point(&market.question, p)),
                    );
                    let added = records.len() - before;
                    let dropped = points.len() - added;

                    self.tracker.mark_processed(&market.token_id);
                    summary.processed += 1;
                    increment_counter(RunCounter::MarketsProcessed, 1);

                    tracing::info!(
                        progress = %format!("{}/{}", i + 1, total),
                        question = %market.question,
                        records = added,
                        dropped,
                        "Fetched history"
                    );
                }
                Err(e) => {
                    summary.errors += 1;
                    increment_counter(RunCounter::FetchErrors, 1);
                    tracing::error!(
                        progress = %format!("{}/{}", i + 1, total),
                        question = %market.question,
                        token_id = %market.token_id,
                        error = %e,
                        "Failed to fetch history"
                    );
                }
            }
        }

        records
    }

    fn export(
        &self,
        mut records: Vec<OutputRecord>,
        summary: &mut RunSummary,
    ) -> Result<(), ProcessorError> {
        if records.is_empty() {
            tracing::info!(
                skipped = summary.skipped,
                errors = summary.errors,
                "No new records, skipping export"
            );
            return Ok(());
        }

        sort_records(&mut records);
        let path = self.exporter.write(&records, Utc::now())?;

        summary.records_written = records.len();
        summary.output_path = Some(path);
        increment_counter(RunCounter::RecordsWritten, records.len() as u64);

        Ok(())
    }
}

/// Whether `market` matches `pattern`, ignoring case.
///
/// Matches on the question text, or on the slug using the hyphenated form
/// of the pattern.
pub fn matches_pattern(market: &MarketDescriptor, pattern: Option<&str>) -> bool {
    let pattern = match pattern.map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => return true,
    };

    if market
        .question
        .to_lowercase()
        .contains(&pattern.to_lowercase())
    {
        return true;
    }

    let slug_pattern = normalize_search(pattern);
    market
        .slug
        .as_deref()
        .is_some_and(|slug| slug.to_lowercase().contains(&slug_pattern))
}
