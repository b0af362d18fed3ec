//! Quote Feed Binary
//!
//! Serves formatted Finnhub prices over HTTP.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin quote-feed
//! ```
//!
//! # Environment Variables
//!
//! - `FINNHUB_TOKEN`: Finnhub access token (default: demo)
//! - `FINNHUB_BASE_URL`: REST base URL (default: <https://finnhub.io/api/v1>)
//! - `FINNHUB_TIMEOUT_MS`: Per-request timeout (default: 10000)
//! - `QUOTE_FEED_TICK_INTERVAL_SECS`: Streaming poll interval (default: 5)
//! - `QUOTE_FEED_HTTP_PORT`: HTTP port (default: 8080)
//! - `QUOTE_FEED_GLYPHS`: "emoji" | "plain" (default: emoji)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: quote-feed)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use quote_feed::infrastructure::telemetry;
use quote_feed::{
    AppState, FeedConfig, FinnhubQuoteSource, HttpServer, PriceFeedService, PriceFormatter,
    init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Quote Feed");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = FeedConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let source = Arc::new(FinnhubQuoteSource::new(&config.finnhub)?);
    let feed = Arc::new(PriceFeedService::new(
        source,
        PriceFormatter::new(config.glyphs.clone()),
        config.polling,
        shutdown_token.clone(),
    ));

    let state = AppState::new(feed, env!("CARGO_PKG_VERSION"));
    let http_server = HttpServer::new(config.server.http_port, state, shutdown_token.clone());
    let mut server = tokio::spawn(http_server.run());

    tracing::info!("Quote feed ready");

    tokio::select! {
        joined = &mut server => {
            shutdown_token.cancel();
            joined??;
            return Ok(());
        }
        () = await_shutdown(shutdown_token.clone()) => {}
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "HTTP server did not stop in time"
        ),
    }

    tracing::info!("Quote feed stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &FeedConfig) {
    tracing::info!(
        http_port = config.server.http_port,
        tick_interval_secs = config.polling.tick_interval.as_secs(),
        "Configuration loaded"
    );
    tracing::debug!(
        base_url = %config.finnhub.base_url,
        timeout_ms = u64::try_from(config.finnhub.timeout.as_millis()).unwrap_or(u64::MAX),
        "Finnhub endpoint"
    );
}

/// Load .env file from any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
