//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Guard and server produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (decision counters, latency histogram)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) set and propagated by tower-http
//! - Metrics are cheap (atomic increments) and off by default

pub mod logging;
pub mod metrics;
