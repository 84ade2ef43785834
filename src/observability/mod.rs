//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Security subsystem produces:
//!     → logging.rs (structured log events, blocked excerpts at WARN)
//!     → metrics.rs (request verdicts, blocked requests, blocked statements)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Blocked traffic is expected adversarial input: WARN, never ERROR
//! - Request ID flows into every block log line
//! - Metrics are cheap (atomic increments) and no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
