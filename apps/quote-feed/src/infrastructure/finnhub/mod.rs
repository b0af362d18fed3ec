//! Finnhub Adapter
//!
//! Implements `QuoteSourcePort` against the Finnhub REST `/quote` endpoint.

mod api_types;
mod client;
mod config;
mod error;

pub use api_types::FinnhubQuoteResponse;
pub use client::FinnhubQuoteSource;
pub use config::{ApiToken, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DEFAULT_TOKEN, FinnhubConfig};
pub use error::FinnhubError;
