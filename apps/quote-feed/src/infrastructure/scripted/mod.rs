//! Scripted quote source for testing.
//!
//! Replays queued outcomes in order, then falls back to a fixed outcome.
//! Each step can carry an artificial latency, which makes slow-provider and
//! cancellation scenarios reproducible without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::QuoteSourcePort;
use crate::domain::quote::{FetchError, FetchOutcome, Quote};

#[derive(Debug, Clone)]
struct Step {
    outcome: FetchOutcome,
    delay: Duration,
}

/// Quote source that replays a script.
#[derive(Debug)]
pub struct ScriptedQuoteSource {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedQuoteSource {
    /// Create a source whose outcome, once the script is exhausted, is
    /// `fallback`.
    #[must_use]
    pub fn new(fallback: FetchOutcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Step {
                outcome: fallback,
                delay: Duration::ZERO,
            },
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Source that always returns `quote`.
    #[must_use]
    pub fn always(quote: Quote) -> Self {
        Self::new(Ok(quote))
    }

    /// Source that always fails with `error`.
    #[must_use]
    pub fn failing(error: FetchError) -> Self {
        Self::new(Err(error))
    }

    /// Apply a latency to the fallback outcome.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.fallback.delay = delay;
        self
    }

    /// Queue an outcome.
    pub fn push(&self, outcome: FetchOutcome) {
        self.push_delayed(outcome, Duration::ZERO);
    }

    /// Queue an outcome that is returned after `delay`.
    pub fn push_delayed(&self, outcome: FetchOutcome, delay: Duration) {
        self.script.lock().push_back(Step { outcome, delay });
    }

    /// Number of fetches started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed in flight at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Decrements the in-flight counter even when the fetch future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuoteSourcePort for ScriptedQuoteSource {
    async fn fetch(&self, _symbol: &str) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let step = self.next_step();
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.outcome
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
