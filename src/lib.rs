//! Request-inspection security layer for HTTP backends.
//!
//! Scans inbound request values for injection signatures, guards the raw
//! statement escape hatch of the database layer, and adds security headers
//! to every response that passed the scan.

pub mod audit;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::ShieldConfig;
pub use error::ShieldError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::{ExecutionContext, Shield, StatementExecutor, Verdict};
