//! Quote Types
//!
//! The provider-agnostic quote snapshot and the outcome of a single fetch.
//! A `Quote` carries the derived values the formatter needs (absolute
//! change, percent change, direction) so the arithmetic lives next to the
//! data it is computed from.

use serde::{Deserialize, Serialize};

// =============================================================================
// Quote
// =============================================================================

/// A point-in-time quote snapshot for one symbol.
///
/// Prices are finite and non-negative; adapters reject payloads that violate
/// this before constructing a `Quote`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Current (last) price.
    pub current_price: f64,
    /// High price of the day.
    pub high_price: f64,
    /// Low price of the day.
    pub low_price: f64,
    /// Open price of the day.
    pub open_price: f64,
    /// Previous session close.
    pub previous_close: f64,
    /// Provider timestamp, Unix epoch seconds.
    pub timestamp: i64,
}

impl Quote {
    /// Absolute change against the previous close.
    #[must_use]
    pub fn change(&self) -> f64 {
        self.current_price - self.previous_close
    }

    /// Percent change against the previous close.
    ///
    /// A zero previous close has no meaningful percentage; it reports `0.0`.
    #[must_use]
    pub fn percent_change(&self) -> f64 {
        if self.previous_close == 0.0 {
            return 0.0;
        }
        (self.change() / self.previous_close) * 100.0
    }

    /// Direction of the move. A change of exactly zero counts as up.
    #[must_use]
    pub fn direction(&self) -> Direction {
        if self.change() >= 0.0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    /// Check that every price is finite and non-negative.
    #[must_use]
    pub fn has_valid_prices(&self) -> bool {
        [
            self.current_price,
            self.high_price,
            self.low_price,
            self.open_price,
            self.previous_close,
        ]
        .iter()
        .all(|p| p.is_finite() && *p >= 0.0)
    }
}

/// Direction of a price move relative to the previous close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Price at or above the previous close.
    Up,
    /// Price below the previous close.
    Down,
}

impl Direction {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

// =============================================================================
// Fetch Outcome
// =============================================================================

/// Result of one fetch attempt against a quote source.
pub type FetchOutcome = Result<Quote, FetchError>;

/// Why a fetch produced no usable quote.
///
/// Every transport or decoding problem is folded into one of these at the
/// source boundary, so callers never see a raw client error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Network failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-success status.
    #[error("upstream returned HTTP {status}")]
    Upstream {
        /// HTTP status code.
        status: u16,
    },

    /// Payload was missing a field, had a non-numeric value, or carried an
    /// invalid price.
    #[error("malformed quote payload: {0}")]
    Schema(String),
}

impl FetchError {
    /// Short label used for metrics and log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Upstream { .. } => "upstream",
            Self::Schema(_) => "schema",
        }
    }
}
