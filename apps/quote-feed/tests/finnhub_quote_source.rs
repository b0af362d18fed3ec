//! Finnhub Adapter Integration Tests
//!
//! Exercises the REST contract against a local mock server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quote_feed::{
    ApiToken, FetchError, FinnhubConfig, FinnhubQuoteSource, PollingSettings, PriceFeedService,
    PriceFormatter, QuoteSourcePort,
};

const TOKEN: &str = "test-token";

fn abc_body() -> serde_json::Value {
    json!({
        "c": 150.25,
        "d": 2.25,
        "dp": 1.5203,
        "h": 151.0,
        "l": 149.5,
        "o": 150.0,
        "pc": 148.0,
        "t": 1_700_000_000
    })
}

fn source_for(server: &MockServer) -> FinnhubQuoteSource {
    let config = FinnhubConfig::new(ApiToken::new(TOKEN)).with_base_url(server.uri());
    FinnhubQuoteSource::new(&config).unwrap()
}

#[tokio::test]
async fn fetches_and_maps_quote() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .and(query_param("symbol", "ABC"))
        .and(query_param("token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(abc_body()))
        .expect(1)
        .mount(&server)
        .await;

    let quote = source_for(&server).fetch("ABC").await.unwrap();

    assert!((quote.current_price - 150.25).abs() < f64::EPSILON);
    assert!((quote.high_price - 151.0).abs() < f64::EPSILON);
    assert!((quote.low_price - 149.5).abs() < f64::EPSILON);
    assert!((quote.open_price - 150.0).abs() < f64::EPSILON);
    assert!((quote.previous_close - 148.0).abs() < f64::EPSILON);
    assert_eq!(quote.timestamp, 1_700_000_000);
}

#[tokio::test]
async fn non_success_status_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .respond_with(ResponseTemplate::new(429).set_body_string("API limit reached"))
        .mount(&server)
        .await;

    let err = source_for(&server).fetch("ABC").await.unwrap_err();

    assert_eq!(err, FetchError::Upstream { status: 429 });
}

#[tokio::test]
async fn missing_field_is_schema_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "c": 150.25,
            "h": 151.0,
            "l": 149.5,
            "o": 150.0,
            "t": 1_700_000_000
        })))
        .mount(&server)
        .await;

    let err = source_for(&server).fetch("ABC").await.unwrap_err();

    assert_eq!(err.kind(), "schema");
}

#[tokio::test]
async fn non_json_body_is_schema_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = source_for(&server).fetch("ABC").await.unwrap_err();

    assert!(matches!(err, FetchError::Schema(_)));
}

#[tokio::test]
async fn slow_provider_is_transport_timeout_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(abc_body())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = FinnhubConfig::new(ApiToken::new(TOKEN))
        .with_base_url(server.uri())
        .with_timeout(Duration::from_millis(50));
    let source = FinnhubQuoteSource::new(&config).unwrap();

    let err = source.fetch("ABC").await.unwrap_err();

    match err {
        FetchError::Transport(message) => {
            assert!(message.starts_with("timeout"), "unexpected message: {message}");
            assert!(!message.contains(TOKEN));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn one_shot_lookup_through_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .and(query_param("symbol", "ABC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(abc_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .and(query_param("symbol", "XYZ"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let feed = PriceFeedService::new(
        Arc::new(source_for(&server)),
        PriceFormatter::default(),
        PollingSettings::default(),
        CancellationToken::new(),
    );

    let text = feed.get_once("ABC").await;
    assert!(text.contains("ABC"));
    assert!(text.contains("150.25"));
    assert!(text.contains("+1.52%"));
    assert!(text.contains("151.00"));
    assert!(text.contains("149.50"));
    assert!(text.contains("📈"));

    assert_eq!(feed.get_once("XYZ").await, "❌ Failed to fetch price for XYZ");
}
