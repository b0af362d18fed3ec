//! Configuration Module
//!
//! Configuration loading for the quote feed service.

mod settings;

pub use settings::{ConfigError, FeedConfig, ServerSettings};
