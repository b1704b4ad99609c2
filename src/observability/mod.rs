//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay, tunnel and admin handlers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the request-id layer into relay logs
//! - Each tunnel logs under its session id
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
