//! Finnhub adapter errors.

use thiserror::Error;

use crate::domain::quote::FetchError;

/// Errors raised while building the Finnhub adapter.
///
/// Request-time failures never use this type; they are reported as
/// `FetchError` through the quote source port.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FinnhubError {
    /// Configuration is unusable.
    #[error("invalid Finnhub configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Fold a `reqwest` error into the fetch taxonomy.
///
/// The request URL carries the access token, so it is stripped before the
/// message is kept.
pub(crate) fn classify(err: reqwest::Error) -> FetchError {
    if err.is_decode() {
        return FetchError::Schema(err.without_url().to_string());
    }
    if let Some(status) = err.status() {
        return FetchError::Upstream {
            status: status.as_u16(),
        };
    }
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else {
        "request"
    };
    FetchError::Transport(format!("{kind}: {}", err.without_url()))
}
