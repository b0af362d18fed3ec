//! Polling Aggregator
//!
//! Turns a one-shot `QuoteSourcePort` into an endless per-subscription
//! sequence of formatted updates.
//!
//! # Scheduling
//!
//! Each subscription is one task sleeping until deadlines at
//! `start + k * period`; the first one (`k = 0`) fires immediately. The fetch
//! runs inside the task, so at most one fetch per subscription is in flight.
//! Deadlines that pass while a fetch (or a delivery to a slow subscriber) is
//! still outstanding are dropped: the task sleeps until the next deadline that
//! has not passed yet, so a slow provider never shifts the schedule.
//!
//! # Failure handling
//!
//! A failed fetch becomes `Tick::Unavailable`, which is logged, counted and
//! dropped. The subscriber only ever sees `PriceUpdate`s; the stream never
//! ends because of a fetch failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::stream::PriceStream;
use crate::application::ports::QuoteSourcePort;
use crate::domain::formatting::{PriceFormatter, PriceUpdate};
use crate::domain::quote::{FetchError, FetchOutcome};
use crate::domain::subscription::{
    PhaseCell, SubscriptionId, SubscriptionPhase, SubscriptionRegistry,
};
use crate::infrastructure::metrics;

/// Default polling cadence.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Floor for the period; a zero period would spin.
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Single-slot hand-off between the subscription task and its handle.
const DELIVERY_CAPACITY: usize = 1;

// =============================================================================
// Settings
// =============================================================================

/// Polling cadence settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingSettings {
    /// Time between ticks.
    pub tick_interval: Duration,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl PollingSettings {
    /// Create settings with the given tick interval.
    #[must_use]
    pub const fn new(tick_interval: Duration) -> Self {
        Self { tick_interval }
    }

    fn period(&self) -> Duration {
        self.tick_interval.max(MIN_TICK_INTERVAL)
    }
}

// =============================================================================
// Tick Resolution
// =============================================================================

/// Result of one tick after formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// A well-formed update for the subscriber.
    Update(PriceUpdate),
    /// No usable quote this tick.
    Unavailable(FetchError),
}

impl Tick {
    /// Format a fetch outcome, mapping failures to the `Unavailable` sentinel.
    #[must_use]
    pub fn resolve(formatter: &PriceFormatter, symbol: &str, outcome: FetchOutcome) -> Self {
        match outcome {
            Ok(quote) => Self::Update(formatter.format(symbol, &quote)),
            Err(err) => Self::Unavailable(err),
        }
    }

    /// The update, if any.
    #[must_use]
    pub fn into_update(self) -> Option<PriceUpdate> {
        match self {
            Self::Update(update) => Some(update),
            Self::Unavailable(_) => None,
        }
    }
}

// =============================================================================
// Aggregator
// =============================================================================

/// Spawns and drives streaming subscriptions.
pub struct PollingAggregator {
    source: Arc<dyn QuoteSourcePort>,
    formatter: PriceFormatter,
    settings: PollingSettings,
    registry: Arc<SubscriptionRegistry>,
}

impl PollingAggregator {
    /// Create an aggregator.
    #[must_use]
    pub fn new(
        source: Arc<dyn QuoteSourcePort>,
        formatter: PriceFormatter,
        settings: PollingSettings,
        registry: Arc<SubscriptionRegistry>,
    ) -> Self {
        Self {
            source,
            formatter,
            settings,
            registry,
        }
    }

    /// Polling settings in use.
    #[must_use]
    pub const fn settings(&self) -> &PollingSettings {
        &self.settings
    }

    /// Start a subscription for `symbol`.
    ///
    /// The subscription stops when the returned handle is cancelled or
    /// dropped, or when `parent` is cancelled. Must be called from within a
    /// tokio runtime.
    #[must_use]
    pub fn spawn(&self, symbol: &str, parent: &CancellationToken) -> PriceStream {
        let id: SubscriptionId = uuid::Uuid::new_v4().as_u64_pair().0;
        let cancel = parent.child_token();
        let phase = Arc::new(PhaseCell::new());
        let (tx, rx) = mpsc::channel(DELIVERY_CAPACITY);

        self.registry.register(id, symbol);
        metrics::set_active_subscriptions(self.registry.active_count());

        tracing::info!(
            subscription_id = id,
            symbol,
            tick_interval_ms = self.settings.period().as_millis(),
            "Subscription started"
        );

        let task = SubscriptionTask {
            id,
            symbol: symbol.to_string(),
            source: Arc::clone(&self.source),
            formatter: self.formatter.clone(),
            schedule: TickSchedule::new(Instant::now(), self.settings.period()),
            phase: Arc::clone(&phase),
            cancel: cancel.clone(),
            tx,
            registry: Arc::clone(&self.registry),
        };
        tokio::spawn(task.run());

        PriceStream::new(id, symbol.to_string(), rx, cancel, phase)
    }
}

// =============================================================================
// Tick Schedule
// =============================================================================

/// Tick deadlines aligned to the subscription start.
#[derive(Debug, Clone, Copy)]
struct TickSchedule {
    start: Instant,
    period: Duration,
}

impl TickSchedule {
    const fn new(start: Instant, period: Duration) -> Self {
        Self { start, period }
    }

    /// Deadline of tick `index` (`start + index * period`).
    fn deadline(&self, index: u64) -> Instant {
        let offset = self.period.as_nanos().saturating_mul(u128::from(index));
        let offset = Duration::from_nanos(u64::try_from(offset).unwrap_or(u64::MAX));
        self.start
            .checked_add(offset)
            .unwrap_or_else(|| Instant::now() + self.period)
    }

    /// Index of the first deadline at or after `now`, and never earlier than
    /// the tick following `fired`.
    fn next_index(&self, fired: u64, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.start).as_nanos();
        let due = elapsed.div_ceil(self.period.as_nanos().max(1));
        u64::try_from(due)
            .unwrap_or(u64::MAX)
            .max(fired.saturating_add(1))
    }
}

// =============================================================================
// Subscription Task
// =============================================================================

struct SubscriptionTask {
    id: SubscriptionId,
    symbol: String,
    source: Arc<dyn QuoteSourcePort>,
    formatter: PriceFormatter,
    schedule: TickSchedule,
    phase: Arc<PhaseCell>,
    cancel: CancellationToken,
    tx: mpsc::Sender<PriceUpdate>,
    registry: Arc<SubscriptionRegistry>,
}

impl SubscriptionTask {
    async fn run(self) {
        let mut index: u64 = 0;
        let mut fired: u64 = 0;

        loop {
            if !self.phase.transition(SubscriptionPhase::Ticking) {
                break;
            }
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep_until(self.schedule.deadline(index)) => {}
            }
            fired += 1;

            if !self.phase.transition(SubscriptionPhase::Fetching) {
                break;
            }
            let started = Instant::now();
            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                outcome = self.source.fetch(&self.symbol) => outcome,
            };
            metrics::record_fetch(outcome.as_ref().err(), started.elapsed());

            match Tick::resolve(&self.formatter, &self.symbol, outcome) {
                Tick::Update(update) => {
                    if !self.phase.transition(SubscriptionPhase::Emitting) {
                        break;
                    }
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => break,
                        sent = self.tx.send(update) => {
                            if sent.is_err() {
                                // Handle dropped without going through cancel().
                                break;
                            }
                        }
                    }
                    metrics::record_update_emitted();
                }
                Tick::Unavailable(err) => {
                    self.phase.transition(SubscriptionPhase::Suppressing);
                    metrics::record_tick_suppressed(&err);
                    tracing::warn!(
                        subscription_id = self.id,
                        symbol = %self.symbol,
                        tick = index,
                        error = %err,
                        "Quote unavailable, skipping tick"
                    );
                }
            }

            let next = self.schedule.next_index(index, Instant::now());
            let skipped = next - index - 1;
            if skipped > 0 {
                metrics::record_ticks_skipped(skipped);
                tracing::debug!(
                    subscription_id = self.id,
                    symbol = %self.symbol,
                    tick = index,
                    skipped,
                    busy_ms = self.schedule.deadline(index).elapsed().as_millis(),
                    "Tick deadlines passed while busy, dropped"
                );
            }
            index = next;
        }

        self.phase.cancel();
        self.registry.deregister(self.id);
        metrics::set_active_subscriptions(self.registry.active_count());
        tracing::info!(
            subscription_id = self.id,
            symbol = %self.symbol,
            ticks = fired,
            "Subscription ended"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::time::timeout;

    use super::*;
    use crate::domain::quote::Quote;
    use crate::infrastructure::scripted::ScriptedQuoteSource;

    const TICK: Duration = Duration::from_millis(20);

    fn quote(price: f64) -> Quote {
        Quote {
            current_price: price,
            high_price: price,
            low_price: price,
            open_price: price,
            previous_close: 1.0,
            timestamp: 1_700_000_000,
        }
    }

    fn aggregator(source: &Arc<ScriptedQuoteSource>) -> (PollingAggregator, Arc<SubscriptionRegistry>) {
        let registry = Arc::new(SubscriptionRegistry::new());
        let aggregator = PollingAggregator::new(
            Arc::clone(source) as Arc<dyn QuoteSourcePort>,
            PriceFormatter::default(),
            PollingSettings::new(TICK),
            Arc::clone(&registry),
        );
        (aggregator, registry)
    }

    #[test]
    fn tick_resolve_success() {
        let tick = Tick::resolve(&PriceFormatter::default(), "ABC", Ok(quote(2.0)));
        let update = tick.into_update().unwrap();
        assert_eq!(update.symbol, "ABC");
        assert!(update.rendered_text.contains("$2.00"));
    }

    #[test]
    fn tick_resolve_failure() {
        let err = FetchError::Transport("connection reset".to_string());
        let tick = Tick::resolve(&PriceFormatter::default(), "ABC", Err(err.clone()));
        assert_eq!(tick, Tick::Unavailable(err));
    }

    #[test]
    fn schedule_drops_deadlines_passed_while_busy() {
        let start = Instant::now();
        let schedule = TickSchedule::new(start, Duration::from_millis(100));
        let at = |ms: u64| start + Duration::from_millis(ms);

        assert_eq!(schedule.deadline(0), start);
        assert_eq!(schedule.deadline(3), at(300));

        // Finished inside the period: next tick is the following one.
        assert_eq!(schedule.next_index(0, at(60)), 1);
        // Finished exactly on a deadline: that deadline still fires.
        assert_eq!(schedule.next_index(0, at(100)), 1);
        // Deadline at 100 passed during the fetch: dropped, resume at 200.
        assert_eq!(schedule.next_index(0, at(150)), 2);
        assert_eq!(schedule.next_index(2, at(350)), 4);
        // Never goes backwards.
        assert_eq!(schedule.next_index(5, at(10)), 6);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let settings = PollingSettings::new(Duration::ZERO);
        assert_eq!(settings.period(), MIN_TICK_INTERVAL);
        assert_eq!(PollingSettings::default().period(), DEFAULT_TICK_INTERVAL);
    }

    /// Offsets from subscription start at which the first `count` updates arrive.
    async fn emission_offsets(fetch_delay: Duration, period: Duration, count: usize) -> Vec<u64> {
        let source = Arc::new(ScriptedQuoteSource::always(quote(5.0)).with_delay(fetch_delay));
        let aggregator = PollingAggregator::new(
            Arc::clone(&source) as Arc<dyn QuoteSourcePort>,
            PriceFormatter::default(),
            PollingSettings::new(period),
            Arc::new(SubscriptionRegistry::new()),
        );

        let start = Instant::now();
        let mut stream = aggregator.spawn("ABC", &CancellationToken::new());
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            stream.next().await.unwrap();
            offsets.push(u64::try_from(start.elapsed().as_millis()).unwrap());
        }
        assert_eq!(source.max_in_flight(), 1);
        offsets
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_follow_start_aligned_schedule() {
        let offsets =
            emission_offsets(Duration::from_millis(60), Duration::from_millis(100), 4).await;
        assert_eq!(offsets, vec![60, 160, 260, 360]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_drops_missed_deadline_without_shifting_schedule() {
        // Fetches start at 0, 200, 400: the deadlines at 100 and 300 pass
        // mid-fetch and are dropped instead of firing on completion.
        let offsets =
            emission_offsets(Duration::from_millis(150), Duration::from_millis(100), 3).await;
        assert_eq!(offsets, vec![150, 350, 550]);
    }

    #[tokio::test(start_paused = true)]
    async fn very_slow_fetch_skips_several_deadlines() {
        let offsets =
            emission_offsets(Duration::from_millis(250), Duration::from_millis(100), 2).await;
        assert_eq!(offsets, vec![250, 550]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_subscriber_does_not_shift_schedule() {
        let source = Arc::new(ScriptedQuoteSource::always(quote(5.0)));
        let (aggregator, _) = aggregator(&source);
        let start = Instant::now();
        let mut stream = aggregator.spawn("ABC", &CancellationToken::new());

        // Tick 0 fills the slot; tick 1 (20ms) blocks on delivery until the
        // slot is drained at 50ms, so deadline 40ms is dropped.
        tokio::time::sleep(Duration::from_millis(50)).await;
        stream.next().await.unwrap();
        stream.next().await.unwrap();
        stream.next().await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_millis(60));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn emits_updates_in_tick_order() {
        let source = Arc::new(ScriptedQuoteSource::always(quote(9.0)));
        source.push(Ok(quote(1.0)));
        source.push(Ok(quote(2.0)));
        source.push(Ok(quote(3.0)));
        let (aggregator, _) = aggregator(&source);

        let stream = aggregator.spawn("ABC", &CancellationToken::new());
        let updates: Vec<_> = timeout(Duration::from_secs(2), stream.take(3).collect())
            .await
            .unwrap();

        let texts: Vec<_> = updates.iter().map(|u| u.rendered_text.as_str()).collect();
        assert!(texts[0].contains("**$1.00**"));
        assert!(texts[1].contains("**$2.00**"));
        assert!(texts[2].contains("**$3.00**"));
    }

    #[tokio::test]
    async fn failures_are_suppressed_and_ticking_continues() {
        let source = Arc::new(ScriptedQuoteSource::always(quote(5.0)));
        source.push(Err(FetchError::Transport("timeout".to_string())));
        source.push(Err(FetchError::Upstream { status: 502 }));
        source.push(Err(FetchError::Schema("missing field `pc`".to_string())));
        let (aggregator, _) = aggregator(&source);

        let mut stream = aggregator.spawn("XYZ", &CancellationToken::new());
        let first = timeout(Duration::from_secs(2), stream.next())
            .await
            .unwrap()
            .unwrap();

        assert!(first.rendered_text.contains("**$5.00**"));
        assert!(source.calls() >= 4);
        assert!(!stream.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_discards_in_flight_result() {
        let source = Arc::new(ScriptedQuoteSource::always(quote(5.0)));
        source.push_delayed(Ok(quote(7.0)), Duration::from_millis(200));
        let (aggregator, _) = aggregator(&source);

        let mut stream = aggregator.spawn("ABC", &CancellationToken::new());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stream.phase(), SubscriptionPhase::Fetching);

        stream.cancel();
        let next = timeout(Duration::from_millis(500), stream.next())
            .await
            .unwrap();

        assert!(next.is_none());
        assert_eq!(stream.phase(), SubscriptionPhase::Cancelled);
    }

    #[tokio::test]
    async fn slow_fetches_skip_ticks_instead_of_overlapping() {
        let source = Arc::new(
            ScriptedQuoteSource::always(quote(5.0)).with_delay(Duration::from_millis(70)),
        );
        let (aggregator, _) = aggregator(&source);

        let stream = aggregator.spawn("ABC", &CancellationToken::new());
        let updates: Vec<_> = timeout(Duration::from_secs(2), stream.take(3).collect())
            .await
            .unwrap();

        assert_eq!(updates.len(), 3);
        assert_eq!(source.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn dropping_handle_deregisters() {
        let source = Arc::new(ScriptedQuoteSource::always(quote(5.0)));
        let (aggregator, registry) = aggregator(&source);

        let stream = aggregator.spawn("ABC", &CancellationToken::new());
        assert_eq!(registry.active_count(), 1);
        drop(stream);

        timeout(Duration::from_secs(1), async {
            while registry.active_count() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn subscriptions_are_independent() {
        let source = Arc::new(ScriptedQuoteSource::always(quote(5.0)));
        let (aggregator, registry) = aggregator(&source);
        let root = CancellationToken::new();

        let first = aggregator.spawn("ABC", &root);
        let mut second = aggregator.spawn("ABC", &root);
        assert_eq!(registry.symbol_count("ABC"), 2);

        first.cancel();
        let update = timeout(Duration::from_secs(1), second.next())
            .await
            .unwrap();

        assert!(update.is_some());
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn parent_cancellation_ends_stream() {
        let source = Arc::new(ScriptedQuoteSource::always(quote(5.0)));
        let (aggregator, _) = aggregator(&source);
        let root = CancellationToken::new();

        let mut stream = aggregator.spawn("ABC", &root);
        root.cancel();

        let next = timeout(Duration::from_millis(500), stream.next())
            .await
            .unwrap();
        assert!(next.is_none());
    }
}
