//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! engine / http / lifecycle produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters for every configuration mutation)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows into every request span
//! - Metrics are cheap (atomic increments) and always recorded; the exporter
//!   only decides whether they are exposed

pub mod logging;
pub mod metrics;
