//! Best bid/ask snapshot for every outcome of one event

use crate::clob::{BookSnapshot, PriceSource};
use crate::http::ApiError;
use crate::market::{extract_slug, MarketDiscovery};
use crate::rate_limit::RateLimiter;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lookup errors
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("invalid event slug or URL: {0:?}")]
    InvalidInput(String),

    #[error("event not found: {0}")]
    NotFound(String),

    #[error("event {0} has no markets")]
    NoMarkets(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Quote for one outcome of one market
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeQuote {
    /// Market question
    pub market: String,
    /// Outcome label
    pub outcome: String,
    /// Token id, `None` when the market's outcome data is inconsistent
    pub token_id: Option<String>,
    /// Best bid/ask, `None` when unavailable
    pub snapshot: Option<BookSnapshot>,
}

impl OutcomeQuote {
    /// `"question: outcome"`
    pub fn label(&self) -> String {
        format!("{}: {}", self.market, self.outcome)
    }
}

/// Quotes for every outcome of an event, in listing order
#[derive(Debug, Clone)]
pub struct EventQuotes {
    pub slug: String,
    pub title: String,
    pub quotes: Vec<OutcomeQuote>,
}

impl EventQuotes {
    /// Quotes keyed by `"question: outcome"`.
    ///
    /// A label already taken by an earlier quote gets its token id appended,
    /// or its position when it has no token, so no quote is dropped.
    pub fn as_map(&self) -> BTreeMap<String, Option<BookSnapshot>> {
        let mut map = BTreeMap::new();
        for (index, quote) in self.quotes.iter().enumerate() {
            let mut key = quote.label();
            if map.contains_key(&key) {
                match &quote.token_id {
                    Some(token_id) => key = format!("{key} ({token_id})"),
                    None => key = format!("{key} (#{})", index + 1),
                }
            }
            map.insert(key, quote.snapshot);
        }
        map
    }
}

/// Resolves an event by slug or URL and quotes all of its outcomes
pub struct EventLookup {
    discovery: Arc<dyn MarketDiscovery>,
    prices: Arc<dyn PriceSource>,
    rate_limiter: Arc<RateLimiter>,
}

impl EventLookup {
    pub fn new(
        discovery: Arc<dyn MarketDiscovery>,
        prices: Arc<dyn PriceSource>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            discovery,
            prices,
            rate_limiter,
        }
    }

    /// Quote every outcome of every market in the event named by `input`.
    ///
    /// Failed per-outcome lookups are logged and recorded without a
    /// snapshot.
    pub async fn lookup_event(&self, input: &str) -> Result<EventQuotes, LookupError> {
        let slug = extract_slug(input).ok_or_else(|| LookupError::InvalidInput(input.to_string()))?;

        tracing::info!(%slug, "Looking up event");
        let event = self
            .discovery
            .find_event(&slug)
            .await?
            .ok_or_else(|| LookupError::NotFound(slug.clone()))?;

        if event.markets.is_empty() {
            return Err(LookupError::NoMarkets(slug));
        }

        let mut quotes = Vec::new();

        for market in &event.markets {
            if let Err(reason) = market.validate() {
                tracing::warn!(question = %market.question, %reason, "Outcome data inconsistent, skipping quotes");
                quotes.extend(market.outcomes.iter().map(|outcome| OutcomeQuote {
                    market: market.question.clone(),
                    outcome: outcome.clone(),
                    token_id: None,
                    snapshot: None,
                }));
                continue;
            }

            for (outcome, token_id) in market.outcome_tokens() {
                self.rate_limiter.wait().await;

                let snapshot = match self.prices.best_prices(token_id).await {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        tracing::warn!(
                            question = %market.question,
                            outcome,
                            token_id,
                            error = %e,
                            "Best price lookup failed"
                        );
                        None
                    }
                };

                quotes.push(OutcomeQuote {
                    market: market.question.clone(),
                    outcome: outcome.to_string(),
                    token_id: Some(token_id.to_string()),
                    snapshot,
                });
            }
        }

        Ok(EventQuotes {
            slug: event.slug,
            title: event.title,
            quotes,
        })
    }
}
