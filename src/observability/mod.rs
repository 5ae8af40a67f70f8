//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher / finalizer / exception handler produce:
//!     → logging.rs (structured log events, one span per dispatch)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Whatever `metrics` recorder the binary installs
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through the dispatch span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
