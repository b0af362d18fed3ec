//! Application Layer - Use cases and port definitions.
//!
//! The price feed service and its polling aggregator live here, written
//! against the `QuoteSourcePort` abstraction.

/// Port interfaces for external systems.
pub mod ports;

/// Application services: one-shot pricing and streaming subscriptions.
pub mod services;
