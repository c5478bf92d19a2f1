//! End-to-end export pipeline tests

use crate::common::{event_json, listing_json, market_json, processor};
use poly_history::export::read_csv;
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_listing(server: &MockServer, markets: Vec<serde_json::Value>) {
    Mock::given(path("/events/pagination"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_json(
            vec![event_json(1, "rain-event", markets)],
            None,
        )))
        .mount(server)
        .await;
}

fn history_body() -> serde_json::Value {
    json!({
        "history": [
            {"t": 1700000000, "p": "0.50"},
            {"t": 1700003600, "p": "0.55"}
        ]
    })
}

#[tokio::test]
async fn test_yes_no_market_exported() {
    let gamma = MockServer::start().await;
    let clob = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&gamma, vec![market_json("Will it rain?", &["Yes", "No"], &["T1", "T2"])]).await;
    Mock::given(path("/prices-history"))
        .and(query_param("market", "T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_body()))
        .expect(1)
        .mount(&clob)
        .await;
    Mock::given(path("/prices-history"))
        .and(query_param("market", "T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_body()))
        .expect(0)
        .mount(&clob)
        .await;

    let processor = processor(&gamma.uri(), &clob.uri(), dir.path(), 5);
    let summary = processor.run().await.unwrap();

    assert_eq!(summary.records_written, 2);
    let records = read_csv(summary.output_path.as_ref().unwrap()).unwrap();
    assert_eq!(records[0].market, "Will it rain?");
    assert_eq!(records[0].probability(), dec!(50.0));
    assert_eq!(records[1].probability(), dec!(55.0));
    assert!(records[0].timestamp < records[1].timestamp);

    assert!(processor.tracker().is_processed("T1"));
    assert!(!processor.tracker().is_processed("T2"));
    let marker = std::fs::read_to_string(dir.path().join("cache/processed.txt")).unwrap();
    assert_eq!(marker, "T1\n");
}

#[tokio::test]
async fn test_mismatched_market_not_fetched() {
    let gamma = MockServer::start().await;
    let clob = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&gamma, vec![market_json("Broken?", &["Yes", "No"], &["T1"])]).await;
    Mock::given(path("/prices-history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_body()))
        .expect(0)
        .mount(&clob)
        .await;

    let summary = processor(&gamma.uri(), &clob.uri(), dir.path(), 5)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.records_written, 0);
    assert!(summary.output_path.is_none());
    assert!(!dir.path().join("output").exists());
}

#[tokio::test]
async fn test_second_run_makes_no_fetches() {
    let gamma = MockServer::start().await;
    let clob = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&gamma, vec![market_json("Will it rain?", &["Yes", "No"], &["T1", "T2"])]).await;
    Mock::given(path("/prices-history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_body()))
        .expect(1)
        .mount(&clob)
        .await;

    let first = processor(&gamma.uri(), &clob.uri(), dir.path(), 5)
        .run()
        .await
        .unwrap();
    assert_eq!(first.records_written, 2);

    // A fresh processor reloads the marker file from disk
    let second = processor(&gamma.uri(), &clob.uri(), dir.path(), 5)
        .run()
        .await
        .unwrap();
    assert_eq!(second.skipped, 1);
    assert_eq!(second.processed, 0);
    assert!(second.output_path.is_none());
}

#[tokio::test]
async fn test_rate_limited_history_backs_off_then_exports() {
    let gamma = MockServer::start().await;
    let clob = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let backoff_ms = 25;

    mount_listing(&gamma, vec![market_json("Will it rain?", &["Yes", "No"], &["T1", "T2"])]).await;
    Mock::given(path("/prices-history"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(3)
        .with_priority(1)
        .expect(3)
        .mount(&clob)
        .await;
    Mock::given(path("/prices-history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_body()))
        .expect(1)
        .mount(&clob)
        .await;

    let processor = processor(&gamma.uri(), &clob.uri(), dir.path(), backoff_ms);
    let start = Instant::now();
    let summary = processor.run().await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(backoff_ms + 2 * backoff_ms));
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.records_written, 2);
}

#[tokio::test]
async fn test_failed_fetch_retried_next_run() {
    let gamma = MockServer::start().await;
    let clob = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&gamma, vec![market_json("Will it rain?", &["Yes", "No"], &["T1", "T2"])]).await;
    Mock::given(path("/prices-history"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&clob)
        .await;
    Mock::given(path("/prices-history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_body()))
        .mount(&clob)
        .await;

    let first = processor(&gamma.uri(), &clob.uri(), dir.path(), 5)
        .run()
        .await
        .unwrap();
    assert_eq!(first.errors, 1);
    assert!(first.output_path.is_none());

    let second = processor(&gamma.uri(), &clob.uri(), dir.path(), 5)
        .run()
        .await
        .unwrap();
    assert_eq!(second.processed, 1);
    assert_eq!(second.records_written, 2);
}

#[tokio::test]
async fn test_discovery_decode_error_is_fatal() {
    let gamma = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(path("/events/pagination"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&gamma)
        .await;

    let result = processor(&gamma.uri(), &gamma.uri(), dir.path(), 5).run().await;
    assert!(result.is_err());
}
