//! Finnhub API wire types.

use serde::Deserialize;

use crate::domain::quote::{FetchError, Quote};

/// Response body of `GET /quote`.
///
/// All six fields are required. Finnhub also sends `d` (change) and `dp`
/// (percent change); those are recomputed locally and ignored here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FinnhubQuoteResponse {
    /// Current price.
    #[serde(rename = "c")]
    pub current: f64,
    /// High price of the day.
    #[serde(rename = "h")]
    pub high: f64,
    /// Low price of the day.
    #[serde(rename = "l")]
    pub low: f64,
    /// Open price of the day.
    #[serde(rename = "o")]
    pub open: f64,
    /// Previous close price.
    #[serde(rename = "pc")]
    pub previous_close: f64,
    /// Unix timestamp in seconds.
    #[serde(rename = "t")]
    pub timestamp: i64,
}

impl FinnhubQuoteResponse {
    /// Decode a response body.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Schema` if a field is missing or non-numeric.
    pub fn parse(body: &str) -> Result<Self, FetchError> {
        serde_json::from_str(body).map_err(|e| FetchError::Schema(e.to_string()))
    }
}

impl TryFrom<FinnhubQuoteResponse> for Quote {
    type Error = FetchError;

    fn try_from(response: FinnhubQuoteResponse) -> Result<Self, Self::Error> {
        let quote = Self {
            current_price: response.current,
            high_price: response.high,
            low_price: response.low,
            open_price: response.open,
            previous_close: response.previous_close,
            timestamp: response.timestamp,
        };
        if !quote.has_valid_prices() {
            return Err(FetchError::Schema(format!(
                "negative or non-finite price in {response:?}"
            )));
        }
        Ok(quote)
    }
}
