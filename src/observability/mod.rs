//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (service, instance, target)
//! - Metrics are cheap (atomic increments) and no-ops until a recorder exists
//! - RUST_LOG overrides the configured log level

pub mod logging;
pub mod metrics;
