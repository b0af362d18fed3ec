//! Subscription Tracking
//!
//! Per-subscription lifecycle state and the registry of live streaming
//! subscriptions.
//!
//! # Design
//!
//! Every streaming subscription owns its own timer and fetch loop; nothing
//! here is shared between subscriptions for their operation. The registry
//! only records which subscriptions exist so the health endpoint and the
//! gauges can report them. Two subscriptions to the same symbol are two
//! independent entries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

// =============================================================================
// Types
// =============================================================================

/// Unique identifier for a streaming subscription.
pub type SubscriptionId = u64;

/// Lifecycle phase of a streaming subscription.
///
/// ```text
/// Idle -> Ticking -> Fetching -> Emitting | Suppressing -> Ticking -> ...
///                                                        -> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPhase {
    /// Created, timer not started yet.
    Idle,
    /// Waiting for the next tick.
    Ticking,
    /// A fetch for the current tick is in flight.
    Fetching,
    /// Delivering a formatted update to the subscriber.
    Emitting,
    /// Dropping the result of a failed fetch.
    Suppressing,
    /// Terminal.
    Cancelled,
}

impl SubscriptionPhase {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ticking => "ticking",
            Self::Fetching => "fetching",
            Self::Emitting => "emitting",
            Self::Suppressing => "suppressing",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether this is the terminal phase.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    const fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Ticking => 1,
            Self::Fetching => 2,
            Self::Emitting => 3,
            Self::Suppressing => 4,
            Self::Cancelled => 5,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Ticking,
            2 => Self::Fetching,
            3 => Self::Emitting,
            4 => Self::Suppressing,
            _ => Self::Cancelled,
        }
    }
}

/// Lock-free holder of a subscription's phase.
///
/// Once `Cancelled` is stored no other transition takes effect.
#[derive(Debug)]
pub struct PhaseCell(AtomicU8);

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseCell {
    /// Create a cell in the `Idle` phase.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(SubscriptionPhase::Idle.to_u8()))
    }

    /// Current phase.
    #[must_use]
    pub fn get(&self) -> SubscriptionPhase {
        SubscriptionPhase::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` unless already cancelled.
    ///
    /// Returns `false` if the transition was refused.
    pub fn transition(&self, next: SubscriptionPhase) -> bool {
        let cancelled = SubscriptionPhase::Cancelled.to_u8();
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != cancelled).then_some(next.to_u8())
            })
            .is_ok()
    }

    /// Move to the terminal phase.
    pub fn cancel(&self) {
        self.0
            .store(SubscriptionPhase::Cancelled.to_u8(), Ordering::Release);
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Registry entry for a live subscription.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionInfo {
    /// Subscription identifier.
    pub id: SubscriptionId,
    /// Symbol being streamed.
    pub symbol: String,
    /// When the subscription was created.
    pub started_at: DateTime<Utc>,
}

/// Snapshot of registry contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionStats {
    /// Number of live subscriptions.
    pub active: usize,
    /// Live subscription count per symbol.
    pub symbols: HashMap<String, usize>,
}

/// Tracks live streaming subscriptions.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: RwLock<HashMap<SubscriptionId, SubscriptionInfo>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new subscription.
    pub fn register(&self, id: SubscriptionId, symbol: &str) {
        let info = SubscriptionInfo {
            id,
            symbol: symbol.to_string(),
            started_at: Utc::now(),
        };
        self.entries.write().insert(id, info);
    }

    /// Remove a subscription. Returns the entry if it was present.
    pub fn deregister(&self, id: SubscriptionId) -> Option<SubscriptionInfo> {
        self.entries.write().remove(&id)
    }

    /// Check whether a subscription is live.
    #[must_use]
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Live subscriptions for a symbol.
    #[must_use]
    pub fn symbol_count(&self, symbol: &str) -> usize {
        self.entries
            .read()
            .values()
            .filter(|info| info.symbol == symbol)
            .count()
    }

    /// Snapshot of all live subscriptions.
    #[must_use]
    pub fn stats(&self) -> SubscriptionStats {
        let entries = self.entries.read();
        let mut symbols: HashMap<String, usize> = HashMap::new();
        for info in entries.values() {
            *symbols.entry(info.symbol.clone()).or_insert(0) += 1;
        }
        SubscriptionStats {
            active: entries.len(),
            symbols,
        }
    }
}
