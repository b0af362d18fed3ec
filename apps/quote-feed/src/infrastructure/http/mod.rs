//! HTTP Controller (Driver Adapter)
//!
//! Axum-based API that delegates to `PriceFeedService`.
//!
//! # Endpoints
//!
//! - `GET /api/v1/price/{symbol}` - One formatted update, or the failure message
//! - `GET /api/v1/stream/{symbol}` - Chunked plain-text stream of updates, each
//!   followed by a blank line and a `---` separator line, until the client
//!   disconnects
//! - Health and metrics routes from `infrastructure::health`

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::{FeedError, PriceFeedService};
use crate::infrastructure::health;

/// Written after every streamed update. Updates end in a newline, so this
/// leaves a blank line before the `---` line.
pub const STREAM_SEPARATOR: &str = "\n---\n";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

// =============================================================================
// Application State
// =============================================================================

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Price feed the handlers delegate to.
    pub feed: Arc<PriceFeedService>,
    /// Application version.
    pub version: String,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Create state with the clock started now.
    #[must_use]
    pub fn new(feed: Arc<PriceFeedService>, version: impl Into<String>) -> Self {
        Self {
            feed,
            version: version.into(),
            started_at: Instant::now(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/price/{symbol}", get(price_handler))
        .route("/api/v1/stream/{symbol}", get(stream_handler))
        .merge(health::routes())
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

#[tracing::instrument(skip(state))]
async fn price_handler(State(state): State<AppState>, Path(symbol): Path<String>) -> Response {
    if symbol.trim().is_empty() {
        return feed_error_response(&FeedError::EmptySymbol);
    }

    let text = state.feed.get_once(&symbol).await;
    ([(header::CONTENT_TYPE, TEXT_PLAIN)], text).into_response()
}

#[tracing::instrument(skip(state))]
async fn stream_handler(State(state): State<AppState>, Path(symbol): Path<String>) -> Response {
    let stream = match state.feed.subscribe(&symbol) {
        Ok(stream) => stream,
        Err(err) => return feed_error_response(&err),
    };

    tracing::info!(subscription_id = stream.id(), symbol = stream.symbol(), "Stream opened");

    // Dropping the body (client gone) drops the handle, which cancels the subscription.
    let chunks = stream
        .into_text()
        .map(|text| Ok::<_, Infallible>(format!("{text}{STREAM_SEPARATOR}")));

    (
        [
            (header::CONTENT_TYPE, TEXT_PLAIN),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(chunks),
    )
        .into_response()
}

fn feed_error_response(err: &FeedError) -> Response {
    let status = match err {
        FeedError::EmptySymbol => StatusCode::BAD_REQUEST,
        FeedError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, err.to_string()).into_response()
}

// =============================================================================
// HTTP Server
// =============================================================================

/// HTTP server for the price, stream, health, and metrics routes.
pub struct HttpServer {
    port: u16,
    state: AppState,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a new HTTP server.
    #[must_use]
    pub const fn new(port: u16, state: AppState, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// Open streams end when `cancel` fires because every subscription token
    /// is a child of the service's shutdown token.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let app = create_router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::Request;
    use tokio::time::timeout;
    use tower::ServiceExt;

    use super::*;
    use crate::application::services::PollingSettings;
    use crate::domain::formatting::PriceFormatter;
    use crate::domain::quote::{FetchError, Quote};
    use crate::infrastructure::scripted::ScriptedQuoteSource;

    fn abc_quote() -> Quote {
        Quote {
            current_price: 150.25,
            high_price: 151.00,
            low_price: 149.50,
            open_price: 150.00,
            previous_close: 148.00,
            timestamp: 1_700_000_000,
        }
    }

    fn state_with(source: ScriptedQuoteSource) -> AppState {
        let feed = PriceFeedService::new(
            Arc::new(source),
            PriceFormatter::default(),
            PollingSettings::new(Duration::from_millis(20)),
            CancellationToken::new(),
        );
        AppState::new(Arc::new(feed), "test")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn price_returns_formatted_text() {
        let app = create_router(state_with(ScriptedQuoteSource::always(abc_quote())));

        let response = app.oneshot(get("/api/v1/price/ABC")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let text = body_text(response).await;
        assert!(text.contains("**ABC**"));
        assert!(text.contains("+1.52%"));
    }

    #[tokio::test]
    async fn price_failure_returns_sentinel() {
        let app = create_router(state_with(ScriptedQuoteSource::failing(
            FetchError::Upstream { status: 502 },
        )));

        let response = app.oneshot(get("/api/v1/price/XYZ")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            "❌ Failed to fetch price for XYZ"
        );
    }

    #[tokio::test]
    async fn blank_symbol_is_bad_request() {
        let state = state_with(ScriptedQuoteSource::always(abc_quote()));

        let price = create_router(state.clone())
            .oneshot(get("/api/v1/price/%20"))
            .await
            .unwrap();
        assert_eq!(price.status(), StatusCode::BAD_REQUEST);

        let stream = create_router(state)
            .oneshot(get("/api/v1/stream/%20%20"))
            .await
            .unwrap();
        assert_eq!(stream.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stream_emits_separated_updates() {
        let state = state_with(ScriptedQuoteSource::always(abc_quote()));
        let feed = Arc::clone(&state.feed);
        let app = create_router(state);

        let response = app.oneshot(get("/api/v1/stream/ABC")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(feed.subscription_stats().active, 1);

        let mut body = response.into_body().into_data_stream();
        let first = timeout(Duration::from_secs(1), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let chunk = String::from_utf8(first.to_vec()).unwrap();
        assert!(chunk.contains("**ABC**"));
        assert!(chunk.ends_with("\n\n---\n"));
        let text = chunk.strip_suffix(STREAM_SEPARATOR).unwrap();
        assert!(text.ends_with('\n'));
        assert!(!text.ends_with("\n\n"));

        drop(body);
        timeout(Duration::from_secs(1), async {
            while feed.subscription_stats().active > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn stream_rejected_during_shutdown() {
        let shutdown = CancellationToken::new();
        let feed = PriceFeedService::new(
            Arc::new(ScriptedQuoteSource::always(abc_quote())),
            PriceFormatter::default(),
            PollingSettings::default(),
            shutdown.clone(),
        );
        shutdown.cancel();
        let app = create_router(AppState::new(Arc::new(feed), "test"));

        let response = app.oneshot(get("/api/v1/stream/ABC")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn liveness_returns_ok() {
        let app = create_router(state_with(ScriptedQuoteSource::always(abc_quote())));
        let response = app.oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn health_reports_json() {
        let app = create_router(state_with(ScriptedQuoteSource::always(abc_quote())));
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], "test");
        assert_eq!(json["subscriptions"]["active"], 0);
    }
}
