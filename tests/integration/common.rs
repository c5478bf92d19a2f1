//! Shared fixtures

use poly_history::clob::{ClobClient, ClobConfig};
use poly_history::export::{ExportFormat, Exporter};
use poly_history::market::{GammaClient, GammaConfig};
use poly_history::processor::{MarketProcessor, ProcessorConfig};
use poly_history::rate_limit::RateLimiter;
use poly_history::tracker::ProcessedItemTracker;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub fn gamma_client(uri: &str, page_size: u32) -> GammaClient {
    GammaClient::with_config(GammaConfig {
        base_url: uri.to_string(),
        timeout: Duration::from_secs(5),
        page_size,
        retry_delay: Duration::from_millis(10),
        max_page_retries: Some(3),
        ..GammaConfig::default()
    })
    .unwrap()
}

pub fn clob_client(uri: &str, initial_backoff_ms: u64) -> ClobClient {
    ClobClient::with_config(ClobConfig {
        base_url: uri.to_string(),
        timeout: Duration::from_secs(5),
        fidelity: 60,
        max_attempts: 5,
        initial_backoff: Duration::from_millis(initial_backoff_ms),
    })
    .unwrap()
}

/// Processor wired to real clients pointed at `gamma_uri` and `clob_uri`
pub fn processor(gamma_uri: &str, clob_uri: &str, workdir: &Path, backoff_ms: u64) -> MarketProcessor {
    MarketProcessor::new(
        Arc::new(gamma_client(gamma_uri, 100)),
        Arc::new(clob_client(clob_uri, backoff_ms)),
        Arc::new(ProcessedItemTracker::open(workdir.join("cache/processed.txt"))),
        Arc::new(RateLimiter::from_millis(0)),
        Exporter::new(workdir.join("output"), "history_{timestamp}", ExportFormat::Csv),
        ProcessorConfig::default(),
    )
}

/// Gamma market JSON with list fields encoded as strings, as the API sends them
pub fn market_json(question: &str, outcomes: &[&str], tokens: &[&str]) -> Value {
    json!({
        "question": question,
        "slug": question.to_lowercase().replace(' ', "-"),
        "conditionId": "0xcond",
        "outcomes": serde_json::to_string(outcomes).unwrap(),
        "clobTokenIds": serde_json::to_string(tokens).unwrap(),
        "active": false,
        "closed": true
    })
}

pub fn event_json(id: u64, slug: &str, markets: Vec<Value>) -> Value {
    json!({
        "id": id.to_string(),
        "slug": slug,
        "title": slug.replace('-', " "),
        "markets": markets
    })
}

pub fn listing_json(events: Vec<Value>, next_offset: Option<u32>) -> Value {
    let count = events.len();
    json!({
        "data": events,
        "count": count,
        "next_offset": next_offset
    })
}
