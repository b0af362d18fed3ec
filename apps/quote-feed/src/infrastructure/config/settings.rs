//! Feed Configuration Settings
//!
//! Configuration types for the quote feed, loaded from environment variables.

use std::time::Duration;

use crate::application::services::{DEFAULT_TICK_INTERVAL, PollingSettings};
use crate::domain::formatting::FormatSymbols;
use crate::infrastructure::finnhub::{
    ApiToken, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DEFAULT_TOKEN, FinnhubConfig,
};

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// HTTP port for the price, stream, health, and metrics routes.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

/// Complete feed configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Finnhub client settings.
    pub finnhub: FinnhubConfig,
    /// Polling cadence for streaming subscriptions.
    pub polling: PollingSettings,
    /// Server port settings.
    pub server: ServerSettings,
    /// Glyph set used when rendering updates.
    pub glyphs: FormatSymbols,
}

impl FeedConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the tick interval is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the tick interval is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("FINNHUB_TOKEN").unwrap_or_else(|| DEFAULT_TOKEN.to_string());
        if token.trim().is_empty() {
            return Err(ConfigError::EmptyValue("FINNHUB_TOKEN".to_string()));
        }

        let base_url = lookup("FINNHUB_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = parse_duration_millis(&lookup, "FINNHUB_TIMEOUT_MS", DEFAULT_TIMEOUT);

        let finnhub = FinnhubConfig::new(ApiToken::new(token.trim()))
            .with_base_url(base_url)
            .with_timeout(timeout);

        let tick_interval = parse_duration_secs(
            &lookup,
            "QUOTE_FEED_TICK_INTERVAL_SECS",
            DEFAULT_TICK_INTERVAL,
        );
        if tick_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "QUOTE_FEED_TICK_INTERVAL_SECS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let server = ServerSettings {
            http_port: parse_u16(
                &lookup,
                "QUOTE_FEED_HTTP_PORT",
                ServerSettings::default().http_port,
            ),
        };

        let glyphs = lookup("QUOTE_FEED_GLYPHS")
            .map(|s| FormatSymbols::from_str_case_insensitive(&s))
            .unwrap_or_default();

        Ok(Self {
            finnhub,
            polling: PollingSettings::new(tick_interval),
            server,
            glyphs,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has a value the service cannot run with.
    #[error("environment variable {key} is invalid: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
}

fn parse_u16<F>(lookup: &F, key: &str, default: u16) -> u16
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_duration_secs<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_duration_millis<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
