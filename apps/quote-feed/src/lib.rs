#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Quote Feed - Polling Price Aggregator
//!
//! Fetches stock quotes from Finnhub and turns them into human-readable
//! price updates, either once on request or as a stream that re-polls on a
//! fixed interval until the subscriber cancels.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Quote values, rendering and subscription state
//!   - `quote`: Quote snapshot, direction, fetch errors
//!   - `formatting`: `PriceFormatter` and glyph sets
//!   - `subscription`: Lifecycle phases and the live subscription registry
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: `QuoteSourcePort`
//!   - `services`: `PriceFeedService`, `PollingAggregator`, `PriceStream`
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `finnhub`: REST quote source
//!   - `http`: Price and stream endpoints
//!   - `health`: Health check and metrics routes
//!   - `config`: Environment configuration
//!
//! # Data Flow
//!
//! ```text
//!                  tick               fetch               format
//! interval ──► PollingAggregator ──► QuoteSourcePort ──► PriceFormatter
//!                    │                                        │
//!                    │ failure: suppress tick                 ▼
//!                    └──────────────────────────── PriceStream ──► subscriber
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Quote types and rendering with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::formatting::{FormatSymbols, PriceFormatter, PriceUpdate};
pub use domain::quote::{Direction, FetchError, FetchOutcome, Quote};
pub use domain::subscription::{
    SubscriptionId, SubscriptionPhase, SubscriptionRegistry, SubscriptionStats,
};

// Application
pub use application::ports::QuoteSourcePort;
pub use application::services::{
    FeedError, PollingAggregator, PollingSettings, PriceFeedService, PriceStream,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, FeedConfig, ServerSettings};

// Adapters
pub use infrastructure::finnhub::{ApiToken, FinnhubConfig, FinnhubError, FinnhubQuoteSource};
pub use infrastructure::scripted::ScriptedQuoteSource;

// HTTP server
pub use infrastructure::http::{AppState, HttpServer, HttpServerError, create_router};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
