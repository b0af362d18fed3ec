//! Subscriber Handle
//!
//! `PriceStream` is the consumer side of a streaming subscription. It is a
//! `futures::Stream` of `PriceUpdate`s that ends only when cancelled.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::formatting::PriceUpdate;
use crate::domain::subscription::{PhaseCell, SubscriptionId, SubscriptionPhase};

/// Handle to a live streaming subscription.
///
/// Once `cancel()` has been called (or the parent token is cancelled) the
/// stream yields `None`, even if an update is already waiting in the
/// hand-off slot. Dropping the handle cancels the subscription.
#[derive(Debug)]
pub struct PriceStream {
    id: SubscriptionId,
    symbol: String,
    rx: mpsc::Receiver<PriceUpdate>,
    cancel: CancellationToken,
    phase: Arc<PhaseCell>,
}

impl PriceStream {
    pub(crate) fn new(
        id: SubscriptionId,
        symbol: String,
        rx: mpsc::Receiver<PriceUpdate>,
        cancel: CancellationToken,
        phase: Arc<PhaseCell>,
    ) -> Self {
        Self {
            id,
            symbol,
            rx,
            cancel,
            phase,
        }
    }

    /// Subscription identifier.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Symbol being streamed.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SubscriptionPhase {
        self.phase.get()
    }

    /// Whether the subscription has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the subscription. Idempotent.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(subscription_id = self.id, symbol = %self.symbol, "Subscription cancelled");
        }
        self.phase.cancel();
        self.cancel.cancel();
    }

    /// Adapt into a stream of rendered text.
    pub fn into_text(self) -> impl Stream<Item = String> + Send {
        futures::StreamExt::map(self, |update| update.rendered_text)
    }
}

impl Stream for PriceStream {
    type Item = PriceUpdate;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancel.is_cancelled() {
            this.phase.cancel();
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

impl Drop for PriceStream {
    fn drop(&mut self) {
        self.cancel();
    }
}
