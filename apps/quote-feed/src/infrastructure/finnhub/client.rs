//! Finnhub quote source.

use async_trait::async_trait;
use reqwest::Client;

use super::api_types::FinnhubQuoteResponse;
use super::config::{ApiToken, FinnhubConfig};
use super::error::{FinnhubError, classify};
use crate::application::ports::QuoteSourcePort;
use crate::domain::quote::{FetchError, FetchOutcome, Quote};

/// `QuoteSourcePort` adapter for the Finnhub REST API.
///
/// Holds one `reqwest::Client`; clones share its connection pool, so every
/// subscription fetches over the same pool without blocking one another.
#[derive(Debug, Clone)]
pub struct FinnhubQuoteSource {
    client: Client,
    quote_url: String,
    token: ApiToken,
}

impl FinnhubQuoteSource {
    /// Create a new adapter from config.
    ///
    /// # Errors
    ///
    /// Returns `FinnhubError::InvalidConfig` for an empty token or base URL,
    /// or `FinnhubError::ClientBuild` if the HTTP client cannot be built.
    pub fn new(config: &FinnhubConfig) -> Result<Self, FinnhubError> {
        if config.token.is_empty() {
            return Err(FinnhubError::InvalidConfig("token is empty".to_string()));
        }
        if config.base_url.is_empty() {
            return Err(FinnhubError::InvalidConfig("base URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FinnhubError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            quote_url: config.quote_url(),
            token: config.token.clone(),
        })
    }

    async fn request(&self, symbol: &str) -> FetchOutcome {
        let response = self
            .client
            .get(&self.quote_url)
            .query(&[("symbol", symbol), ("token", self.token.expose())])
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Upstream {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(classify)?;
        let payload = FinnhubQuoteResponse::parse(&body)?;
        Quote::try_from(payload)
    }
}

#[async_trait]
impl QuoteSourcePort for FinnhubQuoteSource {
    async fn fetch(&self, symbol: &str) -> FetchOutcome {
        let outcome = self.request(symbol).await;
        match &outcome {
            Ok(quote) => tracing::debug!(
                symbol,
                price = quote.current_price,
                provider_ts = quote.timestamp,
                "Quote fetched"
            ),
            Err(err) => tracing::debug!(symbol, error = %err, "Quote fetch failed"),
        }
        outcome
    }

    fn name(&self) -> &'static str {
        "finnhub"
    }
}
