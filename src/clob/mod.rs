//! CLOB price data module
//!
//! Historical price series and order book snapshots from the Polymarket CLOB
//! REST API.

mod book;
mod client;

pub use book::{BookSnapshot, OrderBook, PriceLevel};
pub use client::{ClobClient, ClobConfig, CLOB_API_URL};

use crate::http::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// One sample of a token's price history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix timestamp in seconds
    pub t: i64,
    /// Price as sent by the API
    #[serde(deserialize_with = "price_text")]
    pub p: String,
}

impl PricePoint {
    /// Create a point from a timestamp and raw price text
    pub fn new(t: i64, p: impl Into<String>) -> Self {
        Self { t, p: p.into() }
    }

    /// Parsed price, `None` if the text is not a decimal number
    pub fn price(&self) -> Option<Decimal> {
        parse_price(&self.p)
    }

    /// Sample time, `None` if the timestamp is out of range
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.t, 0)
    }
}

/// Parse a decimal price, accepting plain and scientific notation
pub fn parse_price(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Source of per-token price data
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Full price history for a token
    async fn price_history(&self, token_id: &str) -> Result<Vec<PricePoint>, ApiError>;

    /// Best bid/ask for a token, `None` when the book does not exist
    async fn best_prices(&self, token_id: &str) -> Result<Option<BookSnapshot>, ApiError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriceValue {
    Text(String),
    Number(serde_json::Number),
}

/// The history endpoint sends prices as JSON strings or numbers; keep the text
fn price_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match PriceValue::deserialize(deserializer)? {
        PriceValue::Text(s) => s,
        PriceValue::Number(n) => n.to_string(),
    })
}
