//! Price Formatting
//!
//! Renders a `Quote` into the human-readable summary sent to subscribers.
//! Glyphs are a value (`FormatSymbols`) so channel-specific presentation
//! never leaks into the polling logic.

use chrono::{DateTime, Local, NaiveTime};

use crate::domain::quote::{Direction, Quote};

// =============================================================================
// Format Symbols
// =============================================================================

/// Glyph set used when rendering updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSymbols {
    /// Leading glyph of the title line.
    pub header: String,
    /// Direction indicator for a non-negative change.
    pub up: String,
    /// Direction indicator for a negative change.
    pub down: String,
    /// Leading glyph of the price line.
    pub price: String,
    /// Leading glyph of the high/low line.
    pub range: String,
    /// Leading glyph of the timestamp line.
    pub clock: String,
    /// Marker prefixed to failure messages.
    pub failure: String,
}

impl Default for FormatSymbols {
    fn default() -> Self {
        Self::emoji()
    }
}

impl FormatSymbols {
    /// Emoji glyphs.
    #[must_use]
    pub fn emoji() -> Self {
        Self {
            header: "📊".to_string(),
            up: "📈".to_string(),
            down: "📉".to_string(),
            price: "💰".to_string(),
            range: "🔄".to_string(),
            clock: "⏰".to_string(),
            failure: "❌".to_string(),
        }
    }

    /// ASCII-only glyphs for channels that cannot render emoji.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            header: "#".to_string(),
            up: "[UP]".to_string(),
            down: "[DOWN]".to_string(),
            price: "$".to_string(),
            range: "~".to_string(),
            clock: "@".to_string(),
            failure: "[ERROR]".to_string(),
        }
    }

    /// Parse a glyph set name. Unknown names fall back to emoji.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "plain" | "ascii" => Self::plain(),
            _ => Self::emoji(),
        }
    }

    /// Indicator for a direction.
    #[must_use]
    pub fn direction(&self, direction: Direction) -> &str {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }
}

// =============================================================================
// Price Update
// =============================================================================

/// A formatted update ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUpdate {
    /// Symbol the update is for.
    pub symbol: String,
    /// Rendered summary text.
    pub rendered_text: String,
    /// Wall-clock time the update was rendered.
    pub produced_at: DateTime<Local>,
}

// =============================================================================
// Formatter
// =============================================================================

/// Renders quotes and failure messages.
#[derive(Debug, Clone, Default)]
pub struct PriceFormatter {
    symbols: FormatSymbols,
}

impl PriceFormatter {
    /// Create a formatter with the given glyph set.
    #[must_use]
    pub const fn new(symbols: FormatSymbols) -> Self {
        Self { symbols }
    }

    /// Glyph set in use.
    #[must_use]
    pub const fn symbols(&self) -> &FormatSymbols {
        &self.symbols
    }

    /// Format a quote, stamped with the current local time.
    #[must_use]
    pub fn format(&self, symbol: &str, quote: &Quote) -> PriceUpdate {
        let now = Local::now();
        PriceUpdate {
            symbol: symbol.to_string(),
            rendered_text: self.render(symbol, quote, now.time()),
            produced_at: now,
        }
    }

    /// Render a quote with an explicit wall-clock time.
    #[must_use]
    pub fn render(&self, symbol: &str, quote: &Quote, at: NaiveTime) -> String {
        let s = &self.symbols;
        format!(
            "{} **{}** - {}\n{} **${:.2}** ({:+.2}%)\n{} High: ${:.2} | Low: ${:.2}\n{} Updated: {}\n",
            s.header,
            symbol,
            s.direction(quote.direction()),
            s.price,
            quote.current_price,
            quote.percent_change(),
            s.range,
            quote.high_price,
            quote.low_price,
            s.clock,
            at.format("%H:%M:%S"),
        )
    }

    /// Message returned by one-shot requests when no quote could be fetched.
    #[must_use]
    pub fn failure_message(&self, symbol: &str) -> String {
        format!("{} Failed to fetch price for {symbol}", self.symbols.failure)
    }

    /// Check whether a rendered string is a failure message.
    #[must_use]
    pub fn is_failure(&self, text: &str) -> bool {
        text.starts_with(self.symbols.failure.as_str())
    }
}
