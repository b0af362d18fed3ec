//! Price Feed Service
//!
//! Entry point used by the transport layer: a one-shot price lookup and a
//! streaming subscription, both running quotes through the same
//! fetch -> format -> failure-recovery pipeline.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::polling::{PollingAggregator, PollingSettings, Tick};
use super::stream::PriceStream;
use crate::application::ports::QuoteSourcePort;
use crate::domain::formatting::PriceFormatter;
use crate::domain::subscription::{SubscriptionRegistry, SubscriptionStats};
use crate::infrastructure::metrics;

/// Errors returned when opening a subscription.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// Symbol was empty or whitespace.
    #[error("symbol cannot be empty")]
    EmptySymbol,

    /// The service is shutting down and accepts no new subscriptions.
    #[error("price feed is shutting down")]
    ShuttingDown,
}

/// One-shot and streaming price access for a single quote source.
pub struct PriceFeedService {
    source: Arc<dyn QuoteSourcePort>,
    formatter: PriceFormatter,
    aggregator: PollingAggregator,
    registry: Arc<SubscriptionRegistry>,
    shutdown: CancellationToken,
}

impl PriceFeedService {
    /// Create a service.
    ///
    /// Cancelling `shutdown` ends every subscription opened through it.
    #[must_use]
    pub fn new(
        source: Arc<dyn QuoteSourcePort>,
        formatter: PriceFormatter,
        settings: PollingSettings,
        shutdown: CancellationToken,
    ) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let aggregator = PollingAggregator::new(
            Arc::clone(&source),
            formatter.clone(),
            settings,
            Arc::clone(&registry),
        );
        Self {
            source,
            formatter,
            aggregator,
            registry,
            shutdown,
        }
    }

    /// Fetch and format the current price for `symbol`.
    ///
    /// Never fails: when no quote can be fetched the formatter's failure
    /// message is returned instead.
    #[tracing::instrument(skip(self), fields(source = self.source.name()))]
    pub async fn get_once(&self, symbol: &str) -> String {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return self.formatter.failure_message(symbol);
        }

        let started = std::time::Instant::now();
        let outcome = self.source.fetch(symbol).await;
        metrics::record_fetch(outcome.as_ref().err(), started.elapsed());

        match Tick::resolve(&self.formatter, symbol, outcome) {
            Tick::Update(update) => update.rendered_text,
            Tick::Unavailable(err) => {
                tracing::warn!(error = %err, kind = err.kind(), "One-shot quote fetch failed");
                self.formatter.failure_message(symbol)
            }
        }
    }

    /// Open a streaming subscription for `symbol`.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::EmptySymbol` for a blank symbol and
    /// `FeedError::ShuttingDown` once shutdown has begun.
    pub fn subscribe(&self, symbol: &str) -> Result<PriceStream, FeedError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(FeedError::EmptySymbol);
        }
        if self.shutdown.is_cancelled() {
            return Err(FeedError::ShuttingDown);
        }
        Ok(self.aggregator.spawn(symbol, &self.shutdown))
    }

    /// Snapshot of live subscriptions.
    #[must_use]
    pub fn subscription_stats(&self) -> SubscriptionStats {
        self.registry.stats()
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Polling settings in use.
    #[must_use]
    pub const fn settings(&self) -> &PollingSettings {
        self.aggregator.settings()
    }

    /// Formatter in use.
    #[must_use]
    pub const fn formatter(&self) -> &PriceFormatter {
        &self.formatter
    }
}
