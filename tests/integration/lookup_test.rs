//! Event lookup tests

use crate::common::{clob_client, event_json, gamma_client, market_json};
use poly_history::processor::{EventLookup, LookupError};
use poly_history::rate_limit::RateLimiter;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_lookup_by_url_quotes_all_outcomes() {
    let gamma = MockServer::start().await;
    let clob = MockServer::start().await;

    Mock::given(path("/events"))
        .and(query_param("slug", "fed-decision"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([event_json(
            7,
            "fed-decision",
            vec![
                market_json("Fed cuts?", &["Yes", "No"], &["C1", "C2"]),
                market_json("Fed hikes?", &["Yes", "No"], &["H1", "H2"]),
            ]
        )])))
        .expect(1)
        .mount(&gamma)
        .await;

    Mock::given(path("/book"))
        .and(query_param("token_id", "C1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bids": [{"price": "0.30", "size": "5"}, {"price": "0.62", "size": "12"}],
            "asks": [{"price": "0.64", "size": "9"}]
        })))
        .mount(&clob)
        .await;
    Mock::given(path("/book"))
        .and(query_param("token_id", "H2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&clob)
        .await;
    Mock::given(path("/book"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&clob)
        .await;

    let lookup = EventLookup::new(
        Arc::new(gamma_client(&gamma.uri(), 100)),
        Arc::new(clob_client(&clob.uri(), 5)),
        Arc::new(RateLimiter::from_millis(0)),
    );

    let quotes = lookup
        .lookup_event("https://polymarket.com/event/fed-decision")
        .await
        .unwrap();
    let map = quotes.as_map();

    assert_eq!(map.len(), 4);
    let cut_yes = map["Fed cuts?: Yes"].unwrap();
    assert_eq!(cut_yes.best_bid, Some(dec!(0.62)));
    assert_eq!(cut_yes.best_ask, Some(dec!(0.64)));
    assert_eq!(map["Fed cuts?: No"], None);
    assert_eq!(map["Fed hikes?: No"], None);
}

#[tokio::test]
async fn test_lookup_unknown_event() {
    let gamma = MockServer::start().await;
    Mock::given(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&gamma)
        .await;

    let lookup = EventLookup::new(
        Arc::new(gamma_client(&gamma.uri(), 100)),
        Arc::new(clob_client(&gamma.uri(), 5)),
        Arc::new(RateLimiter::from_millis(0)),
    );

    let err = lookup.lookup_event("nope").await.unwrap_err();
    assert!(matches!(err, LookupError::NotFound(_)));
}
