//! Market discovery module
//!
//! Finds historical markets via the Gamma API and describes them as
//! outcome-label / token-id pairs.

mod gamma;

pub use gamma::{extract_slug, normalize_search, DiscoveryPage, GammaClient, GammaConfig, GAMMA_API_URL};

use crate::http::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single binary or multi-outcome market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDescriptor {
    /// Market question, used as the display name in exports
    pub question: String,
    /// Market slug
    pub slug: Option<String>,
    /// Condition identifier
    pub condition_id: Option<String>,
    /// Outcome labels, positionally matched with `token_ids`
    pub outcomes: Vec<String>,
    /// CLOB token identifiers, one per outcome
    pub token_ids: Vec<String>,
    /// Whether the market is active
    pub active: bool,
    /// Whether the market is closed
    pub closed: bool,
}

impl MarketDescriptor {
    /// Check that every outcome has exactly one token
    pub fn validate(&self) -> Result<(), String> {
        if self.outcomes.len() != self.token_ids.len() {
            return Err(format!(
                "outcome/token count mismatch: {} outcomes, {} tokens",
                self.outcomes.len(),
                self.token_ids.len()
            ));
        }
        Ok(())
    }

    /// Token whose outcome label equals `label`, ignoring case
    pub fn token_for_outcome(&self, label: &str) -> Option<&str> {
        let label = label.trim();
        self.outcomes
            .iter()
            .position(|o| o.trim().eq_ignore_ascii_case(label))
            .and_then(|i| self.token_ids.get(i))
            .map(String::as_str)
    }

    /// `(outcome, token_id)` pairs in listing order
    pub fn outcome_tokens(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes
            .iter()
            .zip(self.token_ids.iter())
            .map(|(o, t)| (o.as_str(), t.as_str()))
    }
}

/// An event grouping one or more markets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Gamma event id
    pub id: Option<String>,
    /// Event slug
    pub slug: String,
    /// Event title
    pub title: String,
    /// Markets belonging to the event
    pub markets: Vec<MarketDescriptor>,
}

/// Source of market descriptors
#[async_trait]
pub trait MarketDiscovery: Send + Sync {
    /// Every market matching the configured filters, flattened across events
    async fn discover_markets(&self) -> Result<Vec<MarketDescriptor>, ApiError>;

    /// Resolve one event by slug or numeric id
    async fn find_event(&self, slug_or_id: &str) -> Result<Option<EventDescriptor>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(outcomes: &[&str], tokens: &[&str]) -> MarketDescriptor {
        MarketDescriptor {
            question: "Will it rain?".to_string(),
            slug: None,
            condition_id: None,
            outcomes: outcomes.iter().map(|s| s.to_string()).collect(),
            token_ids: tokens.iter().map(|s| s.to_string()).collect(),
            active: false,
            closed: true,
        }
    }

    #[test]
    fn test_validate_matching_lengths() {
        assert!(market(&["Yes", "No"], &["T1", "T2"]).validate().is_ok());
    }

    #[test]
    fn test_validate_mismatch() {
        let err = market(&["Yes", "No"], &["T1"]).validate().unwrap_err();
        assert!(err.contains("2 outcomes"));
    }

    #[test]
    fn test_token_for_outcome_case_insensitive() {
        let m = market(&["Yes", "No"], &["T1", "T2"]);
        assert_eq!(m.token_for_outcome("yes"), Some("T1"));
        assert_eq!(m.token_for_outcome("NO"), Some("T2"));
        assert_eq!(m.token_for_outcome("Maybe"), None);
    }

    #[test]
    fn test_outcome_tokens_order() {
        let m = market(&["Up", "Down"], &["a", "b"]);
        let pairs: Vec<_> = m.outcome_tokens().collect();
        assert_eq!(pairs, vec![("Up", "a"), ("Down", "b")]);
    }
}
