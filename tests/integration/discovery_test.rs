//! Discovery pagination tests

use crate::common::{event_json, gamma_client, listing_json, market_json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn events(start: usize, n: usize) -> Vec<serde_json::Value> {
    (start..start + n)
        .map(|i| {
            event_json(
                i as u64,
                &format!("event-{i}"),
                vec![market_json(&format!("Market {i}"), &["Yes", "No"], &["a", "b"])],
            )
        })
        .collect()
}

#[tokio::test]
async fn test_pagination_makes_k_plus_one_calls() {
    let server = MockServer::start().await;
    let limit = 3;
    let full_pages = 2;

    for k in 0..full_pages {
        let offset = k * limit;
        Mock::given(method("GET"))
            .and(path("/events/pagination"))
            .and(query_param("offset", offset.to_string()))
            .and(query_param("limit", limit.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_json(
                events(offset as usize, limit as usize),
                Some(offset + limit),
            )))
            .expect(1)
            .mount(&server)
            .await;
    }

    let last_offset = full_pages * limit;
    Mock::given(method("GET"))
        .and(path("/events/pagination"))
        .and(query_param("offset", last_offset.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing_json(events(last_offset as usize, 1), None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = gamma_client(&server.uri(), limit);
    let markets = client.get_all_markets().await.unwrap();

    assert_eq!(markets.len(), (full_pages * limit + 1) as usize);
    let questions: Vec<_> = markets.iter().map(|m| m.question.clone()).collect();
    let expected: Vec<_> = (0..7).map(|i| format!("Market {i}")).collect();
    assert_eq!(questions, expected);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_filters_sent_as_query() {
    let server = MockServer::start().await;
    Mock::given(path("/events/pagination"))
        .and(query_param("closed", "true"))
        .and(query_param("tag", "crypto"))
        .and(query_param("search", "bitcoin-above"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_json(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    let client = poly_history::market::GammaClient::with_config(poly_history::market::GammaConfig {
        base_url: server.uri(),
        search: Some("Bitcoin  Above".to_string()),
        tag: Some("crypto".to_string()),
        ..Default::default()
    })
    .unwrap();

    assert!(client.get_all_markets().await.unwrap().is_empty());
}
