//! Domain Layer - Quote types, formatting and subscription state.
//!
//! Pure types with no network or file I/O, usable without a runtime. The one
//! side effect is `PriceFormatter::format`, which reads the local clock;
//! `PriceFormatter::render` takes the time explicitly.

/// Quote snapshot and fetch outcome types.
pub mod quote;

/// Rendering of quotes into subscriber-facing text.
pub mod formatting;

/// Subscription lifecycle and registry.
pub mod subscription;
