//! Finnhub client configuration.

use std::time::Duration;

/// Production REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Public sandbox token accepted by Finnhub for a few symbols.
pub const DEFAULT_TOKEN: &str = "demo";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Finnhub access token.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, for the request query only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the token is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ApiToken {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN)
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Configuration for `FinnhubQuoteSource`.
#[derive(Debug, Clone)]
pub struct FinnhubConfig {
    /// REST base URL, without trailing slash.
    pub base_url: String,
    /// Access token sent as the `token` query parameter.
    pub token: ApiToken,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for FinnhubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: ApiToken::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl FinnhubConfig {
    /// Create a configuration with the given token and default endpoint.
    #[must_use]
    pub fn new(token: ApiToken) -> Self {
        Self {
            token,
            ..Default::default()
        }
    }

    /// Override the base URL (tests point this at a local mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the quote endpoint.
    #[must_use]
    pub fn quote_url(&self) -> String {
        format!("{}/quote", self.base_url)
    }
}
