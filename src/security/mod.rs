//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → scanner.rs (query + body values vs. request-surface patterns)
//!     → middleware.rs (403 on match, otherwise continue)
//!     → context.rs (statement guard installed for this request's task)
//!     → host handler (raw statements pass through query_guard.rs)
//!     → headers.rs (security headers on the way out, outside timeout and body limit)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: a last-line pattern guard, not a substitute for
//!   parameterised queries
//! - Fail closed at startup: malformed patterns abort before serving
//! - Guard state is per task, never process-wide

pub mod context;
pub mod headers;
pub mod middleware;
pub mod patterns;
pub mod query_guard;
pub mod scanner;

pub use context::{EntryPoint, ExecutionContext};
pub use headers::{apply_security_headers, security_headers, SECURITY_HEADERS};
pub use middleware::{shield_middleware, BlockedRequest, Shield, BLOCKED_MESSAGE};
pub use patterns::{Pattern, PatternSet, ThreatClass};
pub use query_guard::{ExecuteError, QueryGuard, RawSqlPolicy, StatementExecutor, StatementGuard};
pub use scanner::{BlockReason, RequestScanner, RequestSnapshot, Verdict};
