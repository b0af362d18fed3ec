//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus the HTTP surface and ambient
//! services (configuration, metrics, tracing).

/// Configuration loading.
pub mod config;

/// Finnhub REST quote source.
pub mod finnhub;

/// Health check and metrics routes.
pub mod health;

/// HTTP API and server.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Scripted quote source for tests and local runs.
pub mod scripted;

/// OpenTelemetry tracing integration.
pub mod telemetry;
