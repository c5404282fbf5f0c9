//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher and transport produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never interpolated messages
//! - Metrics are cheap (atomic increments); without an installed recorder
//!   they are no-ops

pub mod logging;
pub mod metrics;
