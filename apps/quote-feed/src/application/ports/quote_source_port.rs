//! Quote Source Port (Driven Port)
//!
//! Interface for fetching a single quote snapshot from an upstream provider.

use async_trait::async_trait;

use crate::domain::quote::FetchOutcome;

/// Port for fetching quotes.
///
/// Implementations must fold every failure (network, timeout, HTTP status,
/// payload decoding) into the returned `FetchOutcome`; the polling loop
/// treats any `Err` as "no quote this tick". Ticker validity is the
/// provider's concern, not the adapter's.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSourcePort: Send + Sync {
    /// Fetch the current quote for `symbol`.
    async fn fetch(&self, symbol: &str) -> FetchOutcome;

    /// Provider name for logs and metrics.
    fn name(&self) -> &'static str;
}
