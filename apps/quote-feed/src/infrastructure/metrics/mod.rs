//! Prometheus Metrics Module
//!
//! Exposes polling and delivery metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Fetches**: upstream fetch attempts by outcome, and their latency
//! - **Ticks**: updates delivered, ticks suppressed after a failure, ticks
//!   skipped because a fetch outlasted the interval
//! - **Subscriptions**: live streaming subscriptions
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the HTTP port. Recording before
//! `init_metrics` is a no-op.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::domain::quote::FetchError;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if another global recorder was already installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "quote_feed_fetches_total",
        "Upstream quote fetch attempts by outcome"
    );
    describe_histogram!(
        "quote_feed_fetch_duration_seconds",
        "Upstream quote fetch latency"
    );
    describe_counter!(
        "quote_feed_updates_emitted_total",
        "Formatted updates delivered to streaming subscribers"
    );
    describe_counter!(
        "quote_feed_ticks_suppressed_total",
        "Ticks dropped because the fetch failed"
    );
    describe_counter!(
        "quote_feed_ticks_skipped_total",
        "Ticks skipped because the previous fetch was still outstanding"
    );
    describe_gauge!(
        "quote_feed_active_subscriptions",
        "Number of live streaming subscriptions"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label for a fetch.
#[must_use]
pub const fn outcome_label(error: Option<&FetchError>) -> &'static str {
    match error {
        None => "success",
        Some(err) => err.kind(),
    }
}

/// Record a completed fetch.
pub fn record_fetch(error: Option<&FetchError>, duration: Duration) {
    let outcome = outcome_label(error);
    counter!("quote_feed_fetches_total", "outcome" => outcome).increment(1);
    histogram!("quote_feed_fetch_duration_seconds", "outcome" => outcome)
        .record(duration.as_secs_f64());
}

/// Record an update delivered to a subscriber.
pub fn record_update_emitted() {
    counter!("quote_feed_updates_emitted_total").increment(1);
}

/// Record a tick dropped after a failed fetch.
pub fn record_tick_suppressed(error: &FetchError) {
    counter!("quote_feed_ticks_suppressed_total", "reason" => error.kind()).increment(1);
}

/// Record ticks skipped while a fetch was outstanding.
pub fn record_ticks_skipped(count: u64) {
    counter!("quote_feed_ticks_skipped_total").increment(count);
}

/// Update the live subscription gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_active_subscriptions(count: usize) {
    gauge!("quote_feed_active_subscriptions").set(count as f64);
}

// =============================================================================
// Tests
// =============================================================================
