//! Lookup command implementation

use crate::clob::ClobClient;
use crate::config::Config;
use crate::market::GammaClient;
use crate::processor::{EventLookup, EventQuotes};
use anyhow::Context;
use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Event slug or Polymarket event URL
    pub input: String,
}

impl LookupArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<EventQuotes> {
        let discovery =
            GammaClient::with_config(config.gamma_config()).context("Failed to build Gamma client")?;
        let prices =
            ClobClient::with_config(config.clob_config()).context("Failed to build CLOB client")?;

        let lookup = EventLookup::new(
            Arc::new(discovery),
            Arc::new(prices),
            Arc::new(config.rate_limiter()),
        );

        let quotes = lookup
            .lookup_event(&self.input)
            .await
            .with_context(|| format!("Lookup failed for {}", self.input))?;

        print!("{}", render_table(&quotes));
        Ok(quotes)
    }
}

fn fmt_opt(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Plain-text table of best bid/ask per outcome
pub fn render_table(quotes: &EventQuotes) -> String {
    let rows: Vec<[String; 5]> = quotes
        .quotes
        .iter()
        .map(|q| {
            let s = q.snapshot.unwrap_or_default();
            [
                q.label(),
                fmt_opt(s.best_bid),
                fmt_opt(s.best_bid_size),
                fmt_opt(s.best_ask),
                fmt_opt(s.best_ask_size),
            ]
        })
        .collect();

    let header = ["Market: Outcome", "Bid", "Bid Size", "Ask", "Ask Size"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = format!("{} ({})\n", quotes.title, quotes.slug);
    let line = |cells: &[&str]| {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    out.push_str(&line(&header[..]));
    out.push('\n');
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&line(&cells));
        out.push('\n');
    }
    out
}
