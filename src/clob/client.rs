//! Polymarket CLOB REST client
//!
//! Fetches price history and order books for individual outcome tokens.
//! A 404 means the token has no data and is returned as an empty result.
//! A 429 is retried with exponential backoff up to a bounded number of
//! attempts; every other error is returned immediately.

use super::{BookSnapshot, OrderBook, PriceLevel, PricePoint, PriceSource};
use crate::http::{ApiClient, ApiError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Polymarket CLOB REST base URL
pub const CLOB_API_URL: &str = "https://clob.polymarket.com";

const HISTORY_PATH: &str = "/prices-history";
const BOOK_PATH: &str = "/book";

/// Configuration for the CLOB client
#[derive(Debug, Clone)]
pub struct ClobConfig {
    /// Base URL for the CLOB API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Sampling granularity passed as `fidelity`
    pub fidelity: u32,
    /// Total attempts per request when throttled, including the first
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles on each further retry
    pub initial_backoff: Duration,
}

impl Default for ClobConfig {
    fn default() -> Self {
        Self {
            base_url: CLOB_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            fidelity: 60,
            max_attempts: 5,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

/// Client for price history and order books
pub struct ClobClient {
    config: ClobConfig,
    api: ApiClient,
}

impl ClobClient {
    /// Create a client with custom configuration
    pub fn with_config(config: ClobConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.base_url, config.timeout)?;
        Ok(Self { config, api })
    }

    /// Full price history for `token_id` at the configured fidelity.
    ///
    /// An empty id returns an empty series without a request.
    pub async fn get_history(&self, token_id: &str) -> Result<Vec<PricePoint>, ApiError> {
        let token_id = token_id.trim();
        if token_id.is_empty() {
            return Ok(Vec::new());
        }

        let query = [
            ("market", token_id.to_string()),
            ("interval", "max".to_string()),
            ("fidelity", self.config.fidelity.to_string()),
        ];

        match self
            .get_with_backoff::<HistoryResponse>(HISTORY_PATH, &query)
            .await
        {
            Ok(response) => {
                tracing::debug!(token_id, points = response.history.len(), "Fetched price history");
                Ok(response.history)
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(token_id, "No price history for token");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Order book for `token_id`, `None` when the API has no book
    pub async fn get_order_book(&self, token_id: &str) -> Result<Option<OrderBook>, ApiError> {
        let token_id = token_id.trim();
        if token_id.is_empty() {
            return Ok(None);
        }

        let query = [("token_id", token_id.to_string())];

        match self.get_with_backoff::<BookResponse>(BOOK_PATH, &query).await {
            Ok(response) => Ok(Some(response.into_order_book(token_id))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Best bid/ask for `token_id`
    pub async fn get_best_prices(&self, token_id: &str) -> Result<Option<BookSnapshot>, ApiError> {
        Ok(self
            .get_order_book(token_id)
            .await?
            .map(|book| book.snapshot()))
    }

    async fn get_with_backoff<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut backoff = self.config.initial_backoff;
        let mut attempt = 1;

        loop {
            match self.api.get_json(path, query).await {
                Err(e) if e.is_rate_limited() && attempt < max_attempts => {
                    tracing::warn!(
                        path,
                        attempt,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        "Rate limited by CLOB API, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl PriceSource for ClobClient {
    async fn price_history(&self, token_id: &str) -> Result<Vec<PricePoint>, ApiError> {
        self.get_history(token_id).await
    }

    async fn best_prices(&self, token_id: &str) -> Result<Option<BookSnapshot>, ApiError> {
        self.get_best_prices(token_id).await
    }
}

/// Price history response
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Vec<PricePoint>,
}

/// Order book response from `/book`
#[derive(Debug, Deserialize)]
struct BookResponse {
    #[serde(default)]
    bids: Vec<BookLevel>,
    #[serde(default)]
    asks: Vec<BookLevel>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Price level in the order book
#[derive(Debug, Deserialize)]
struct BookLevel {
    price: String,
    size: String,
}

impl BookResponse {
    fn into_order_book(self, token_id: &str) -> OrderBook {
        let updated_at = self
            .timestamp
            .as_deref()
            .and_then(|ts| ts.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        OrderBook::from_levels(
            token_id,
            parse_levels(self.bids),
            parse_levels(self.asks),
            updated_at,
        )
    }
}

/// Drop levels whose price or size does not parse
fn parse_levels(levels: Vec<BookLevel>) -> Vec<PriceLevel> {
    levels
        .into_iter()
        .filter_map(|level| {
            let price = Decimal::from_str(level.price.trim()).ok()?;
            let size = Decimal::from_str(level.size.trim()).ok()?;
            Some(PriceLevel { price, size })
        })
        .collect()
}
