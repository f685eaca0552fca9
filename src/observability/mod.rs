//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay and HTTP layers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows through the trace layer span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
