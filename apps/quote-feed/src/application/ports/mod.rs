//! Port Interfaces
//!
//! Contracts between the application services and the outside world.
//!
//! ## Driven Ports (Outbound)
//!
//! - `QuoteSourcePort`: one-shot quote fetch from the upstream provider

mod quote_source_port;

#[cfg(test)]
pub use quote_source_port::MockQuoteSourcePort;
pub use quote_source_port::QuoteSourcePort;
