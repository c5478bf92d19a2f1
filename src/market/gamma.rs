//! Gamma API client for market discovery
//!
//! Pages through the event listing endpoint and flattens each event's
//! markets into [`MarketDescriptor`]s. Transient failures retry the same page
//! after a fixed delay instead of aborting the whole discovery.

use super::{EventDescriptor, MarketDescriptor, MarketDiscovery};
use crate::http::{ApiClient, ApiError};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Gamma API base URL
pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

const LISTING_PATH: &str = "/events/pagination";
const EVENTS_PATH: &str = "/events";

/// Configuration for the Gamma client
#[derive(Debug, Clone)]
pub struct GammaConfig {
    /// Base URL for the Gamma API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Free-text search, sent in slug form
    pub search: Option<String>,
    /// Tag slug filter
    pub tag: Option<String>,
    /// Only closed events
    pub closed: bool,
    /// Only archived events
    pub archived: bool,
    /// Events requested per page
    pub page_size: u32,
    /// Pause before retrying a failed page
    pub retry_delay: Duration,
    /// Give up on a page after this many consecutive transient failures
    /// (`None` retries forever)
    pub max_page_retries: Option<u32>,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            base_url: GAMMA_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            search: None,
            tag: None,
            closed: true,
            archived: false,
            page_size: 100,
            retry_delay: Duration::from_secs(5),
            max_page_retries: None,
        }
    }
}

/// One page of listing results
#[derive(Debug, Clone)]
pub struct DiscoveryPage {
    /// Events on this page
    pub events: Vec<EventDescriptor>,
    /// Total reported by the API, if any
    pub total: Option<u64>,
    /// Offset of the next page, `None` when this was the last one
    pub next_offset: Option<u32>,
}

/// Client for Polymarket's Gamma API
pub struct GammaClient {
    config: GammaConfig,
    api: ApiClient,
}

impl GammaClient {
    /// Create a client with custom configuration
    pub fn with_config(config: GammaConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.base_url, config.timeout)?;
        Ok(Self { config, api })
    }

    /// Fetch a single listing page
    pub async fn get_page(&self, offset: u32, limit: u32) -> Result<DiscoveryPage, ApiError> {
        let query = self.listing_query(offset, limit);
        let response: ListingResponse = self.api.get_json(LISTING_PATH, &query).await?;

        let events: Vec<EventDescriptor> =
            response.data.into_iter().map(EventDescriptor::from).collect();

        let next_offset = if events.len() < limit as usize {
            None
        } else {
            match response.next_offset {
                Some(next) if next > offset => Some(next),
                Some(next) => {
                    tracing::warn!(offset, next, "Listing returned a non-advancing offset, stopping");
                    None
                }
                None => None,
            }
        };

        Ok(DiscoveryPage {
            events,
            total: response.count,
            next_offset,
        })
    }

    /// Page through the listing until exhausted, returning all events
    pub async fn get_all_events(&self) -> Result<Vec<EventDescriptor>, ApiError> {
        let limit = self.config.page_size.max(1);
        let mut offset = 0;
        let mut pages = 0u32;
        let mut events = Vec::new();

        loop {
            let page = self.get_page_with_retry(offset, limit).await?;
            pages += 1;
            events.extend(page.events);

            tracing::info!(
                page = pages,
                offset,
                events = events.len(),
                total = ?page.total,
                "Fetched discovery page"
            );

            match page.next_offset {
                Some(next) => offset = next,
                None => break,
            }
        }

        Ok(events)
    }

    /// Page through the listing and flatten events into markets
    pub async fn get_all_markets(&self) -> Result<Vec<MarketDescriptor>, ApiError> {
        let events = self.get_all_events().await?;
        let event_count = events.len();

        let markets: Vec<MarketDescriptor> =
            events.into_iter().flat_map(|e| e.markets).collect();

        tracing::info!(
            events = event_count,
            markets = markets.len(),
            "Discovery complete"
        );

        Ok(markets)
    }

    /// Look up an event by slug, or by id when the key is numeric.
    ///
    /// A 404 or an empty result maps to `None`.
    pub async fn get_by_slug_or_id(&self, key: &str) -> Result<Option<EventDescriptor>, ApiError> {
        let key = key.trim();
        if key.is_empty() {
            return Ok(None);
        }

        let field = if key.chars().all(|c| c.is_ascii_digit()) {
            "id"
        } else {
            "slug"
        };

        match self
            .api
            .get_json::<Vec<GammaEvent>>(EVENTS_PATH, &[(field, key.to_string())])
            .await
        {
            Ok(events) => Ok(events.into_iter().next().map(EventDescriptor::from)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_page_with_retry(&self, offset: u32, limit: u32) -> Result<DiscoveryPage, ApiError> {
        let mut failures = 0u32;

        loop {
            match self.get_page(offset, limit).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() => {
                    failures += 1;
                    if let Some(max) = self.config.max_page_retries {
                        if failures > max {
                            tracing::error!(offset, failures, error = %e, "Giving up on discovery page");
                            return Err(e);
                        }
                    }

                    tracing::warn!(
                        offset,
                        attempt = failures,
                        retry_in_ms = self.config.retry_delay.as_millis() as u64,
                        error = %e,
                        "Discovery page failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn listing_query(&self, offset: u32, limit: u32) -> Vec<(&'static str, String)> {
        let mut query = vec![("offset", offset.to_string()), ("limit", limit.to_string())];

        if let Some(tag) = self.config.tag.as_deref().filter(|t| !t.trim().is_empty()) {
            query.push(("tag", tag.trim().to_string()));
        }
        if self.config.closed {
            query.push(("closed", "true".to_string()));
        }
        if self.config.archived {
            query.push(("archived", "true".to_string()));
        }
        if let Some(search) = self.config.search.as_deref() {
            let normalized = normalize_search(search);
            if !normalized.is_empty() {
                query.push(("search", normalized));
            }
        }

        query
    }
}

#[async_trait]
impl MarketDiscovery for GammaClient {
    async fn discover_markets(&self) -> Result<Vec<MarketDescriptor>, ApiError> {
        self.get_all_markets().await
    }

    async fn find_event(&self, slug_or_id: &str) -> Result<Option<EventDescriptor>, ApiError> {
        self.get_by_slug_or_id(slug_or_id).await
    }
}

/// Lower-case `text` and join its words with hyphens, the way Polymarket
/// builds slugs
pub fn normalize_search(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Pull an event slug out of a raw slug or a Polymarket URL.
///
/// Accepts `some-slug`, `https://polymarket.com/event/some-slug`, and URLs
/// with trailing market segments, query strings or fragments.
pub fn extract_slug(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let is_url = input.contains("://") || input.contains('/') || input.contains("polymarket.com");
    let slug = if is_url {
        let without_scheme = input.split_once("://").map_or(input, |(_, rest)| rest);
        let path = without_scheme
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments
            .iter()
            .position(|s| *s == "event" || *s == "market")
            .and_then(|i| segments.get(i + 1))
        {
            Some(slug) => (*slug).to_string(),
            None => segments
                .iter()
                .skip(1)
                .last()
                .map(|s| (*s).to_string())
                .unwrap_or_default(),
        }
    } else {
        input.to_string()
    };

    if slug.is_empty() || slug.chars().any(char::is_whitespace) {
        None
    } else {
        Some(slug)
    }
}

/// Listing response from the pagination endpoint
#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default, deserialize_with = "null_default")]
    data: Vec<GammaEvent>,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    next_offset: Option<u32>,
}

/// Raw event from the Gamma API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaEvent {
    #[serde(default, deserialize_with = "string_or_number")]
    id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    slug: String,
    #[serde(default, deserialize_with = "null_default")]
    title: String,
    #[serde(default, deserialize_with = "null_default")]
    markets: Vec<GammaMarket>,
}

/// Raw market from the Gamma API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaMarket {
    #[serde(default, deserialize_with = "null_default")]
    question: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    condition_id: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    outcomes: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    clob_token_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    active: bool,
    #[serde(default, deserialize_with = "null_default")]
    closed: bool,
}

impl From<GammaMarket> for MarketDescriptor {
    fn from(m: GammaMarket) -> Self {
        Self {
            question: m.question,
            slug: m.slug,
            condition_id: m.condition_id,
            outcomes: m.outcomes,
            token_ids: m.clob_token_ids,
            active: m.active,
            closed: m.closed,
        }
    }
}

impl From<GammaEvent> for EventDescriptor {
    fn from(e: GammaEvent) -> Self {
        Self {
            id: e.id,
            slug: e.slug,
            title: e.title,
            markets: e.markets.into_iter().map(MarketDescriptor::from).collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringList {
    List(Vec<String>),
    Encoded(String),
}

/// Gamma sends list fields either as arrays or as JSON-encoded strings
/// (`"[\"Yes\", \"No\"]"`)
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringList>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(StringList::List(items)) => Ok(items),
        Some(StringList::Encoded(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(StringList::Encoded(s)) => serde_json::from_str(&s).map_err(|e| {
            serde::de::Error::custom(format!("invalid encoded list {s:?}: {e}"))
        }),
    }
}

/// Gamma sends `null` for fields it has no value for; treat it as absent
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
            StringOrNumber::Text(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }),
    )
}
