//! Application Services
//!
//! - `PriceFeedService`: one-shot lookups and subscription entry point
//! - `PollingAggregator`: per-subscription tick loop
//! - `PriceStream`: subscriber-side handle

mod polling;
mod price_feed;
mod stream;

pub use polling::{DEFAULT_TICK_INTERVAL, PollingAggregator, PollingSettings, Tick};
pub use price_feed::{FeedError, PriceFeedService};
pub use stream::PriceStream;
