//! Raw statement guard.
//!
//! # Responsibilities
//! - Define the raw statement escape hatch as a trait
//! - Decorate an executor so dangerous statement text never reaches it
//! - Report the offending excerpt for audit
//!
//! # Design Decisions
//! - Only the raw escape hatch is guarded; ORM-built parameterised queries
//!   never pass through here, otherwise every SELECT would be rejected
//! - The decorated executor keeps the inner executor's exact signature
//! - Inner results and inner errors are returned untouched

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::observability::metrics;
use crate::security::patterns::PatternSet;

/// Default length of the statement excerpt carried by a rejection.
pub const DEFAULT_EXCERPT_LEN: usize = 200;

/// Errors raised on the raw statement path.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Statement text matched the query-danger patterns.
    #[error("Potential SQL injection attempt detected: {excerpt}")]
    BlockedStatement { excerpt: String },

    /// Raw statements are disabled altogether.
    #[error("Raw SQL is forbidden: {excerpt}")]
    RawSqlForbidden { excerpt: String },

    /// The underlying executor failed.
    #[error("statement execution failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ExecuteError {
    /// Wrap an executor-specific error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ExecuteError::Backend(Box::new(err))
    }

    /// True when the guard refused the statement.
    pub fn is_blocked(&self) -> bool {
        matches!(
            self,
            ExecuteError::BlockedStatement { .. } | ExecuteError::RawSqlForbidden { .. }
        )
    }
}

impl IntoResponse for ExecuteError {
    fn into_response(self) -> Response {
        if self.is_blocked() {
            (StatusCode::FORBIDDEN, "Statement rejected.").into_response()
        } else {
            tracing::error!(error = %self, "Raw statement failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// The raw statement escape hatch of a database layer.
pub trait StatementExecutor: Send + Sync {
    /// Rows or status returned by the database.
    type Rows;

    fn execute(&self, sql: &str, params: &[Value]) -> Result<Self::Rows, ExecuteError>;
}

impl<E: StatementExecutor + ?Sized> StatementExecutor for Arc<E> {
    type Rows = E::Rows;

    fn execute(&self, sql: &str, params: &[Value]) -> Result<Self::Rows, ExecuteError> {
        (**self).execute(sql, params)
    }
}

/// How raw statements are treated while a guard is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawSqlPolicy {
    /// Reject statements matching the query-danger patterns.
    #[default]
    Scan,
    /// Reject every raw statement.
    Deny,
}

/// First `max_chars` characters of `sql`.
pub fn excerpt(sql: &str, max_chars: usize) -> String {
    sql.chars().take(max_chars).collect()
}

/// Statement check shared by every guarded executor.
#[derive(Debug, Clone)]
pub struct StatementGuard {
    patterns: Arc<PatternSet>,
    excerpt_len: usize,
    policy: RawSqlPolicy,
}

impl StatementGuard {
    pub fn new(patterns: Arc<PatternSet>) -> Self {
        Self {
            patterns,
            excerpt_len: DEFAULT_EXCERPT_LEN,
            policy: RawSqlPolicy::Scan,
        }
    }

    pub fn with_excerpt_len(mut self, excerpt_len: usize) -> Self {
        self.excerpt_len = excerpt_len;
        self
    }

    pub fn with_policy(mut self, policy: RawSqlPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RawSqlPolicy {
        self.policy
    }

    /// Validate statement text. Does not execute anything.
    pub fn check(&self, sql: &str) -> Result<(), ExecuteError> {
        match self.policy {
            RawSqlPolicy::Deny => {
                let excerpt = excerpt(sql, self.excerpt_len);
                tracing::warn!(statement = %excerpt, "Raw statement refused by deny policy");
                metrics::record_statement_blocked("forbidden");
                Err(ExecuteError::RawSqlForbidden { excerpt })
            }
            RawSqlPolicy::Scan => match self.patterns.first_match(sql) {
                Some(pattern) => {
                    let excerpt = excerpt(sql, self.excerpt_len);
                    tracing::warn!(
                        threat = %pattern.threat(),
                        statement = %excerpt,
                        "Dangerous raw statement blocked"
                    );
                    metrics::record_statement_blocked(pattern.threat().as_str());
                    Err(ExecuteError::BlockedStatement { excerpt })
                }
                None => Ok(()),
            },
        }
    }
}

/// Executor decorator that checks statement text before forwarding.
#[derive(Debug, Clone)]
pub struct QueryGuard<E> {
    guard: Arc<StatementGuard>,
    inner: E,
}

impl<E: StatementExecutor> QueryGuard<E> {
    pub fn wrap(guard: Arc<StatementGuard>, inner: E) -> Self {
        Self { guard, inner }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: StatementExecutor> StatementExecutor for QueryGuard<E> {
    type Rows = E::Rows;

    fn execute(&self, sql: &str, params: &[Value]) -> Result<Self::Rows, ExecuteError> {
        self.guard.check(sql)?;
        self.inner.execute(sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every call and answers with a canned result.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Vec<Value>)>>,
        fail: bool,
    }

    #[derive(Debug, Error)]
    #[error("connection reset")]
    struct ConnectionReset;

    impl StatementExecutor for Recorder {
        type Rows = usize;

        fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, ExecuteError> {
            self.calls.lock().unwrap().push((sql.to_string(), params.to_vec()));
            if self.fail {
                Err(ExecuteError::backend(ConnectionReset))
            } else {
                Ok(42)
            }
        }
    }

    fn guard() -> Arc<StatementGuard> {
        Arc::new(StatementGuard::new(Arc::new(PatternSet::query_danger().unwrap())))
    }

    #[test]
    fn test_dangerous_statement_never_reaches_executor() {
        let guarded = QueryGuard::wrap(guard(), Recorder::default());
        let err = guarded
            .execute("DROP TABLE reservations", &[])
            .unwrap_err();
        assert!(matches!(err, ExecuteError::BlockedStatement { ref excerpt } if excerpt == "DROP TABLE reservations"));
        assert!(guarded.inner().calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_excerpt_is_first_200_chars() {
        let sql = format!("select {}", "x".repeat(400));
        let guarded = QueryGuard::wrap(guard(), Recorder::default());
        match guarded.execute(&sql, &[]) {
            Err(ExecuteError::BlockedStatement { excerpt }) => {
                assert_eq!(excerpt, sql.chars().take(200).collect::<String>());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_benign_statement_forwarded_unchanged() {
        let guarded = QueryGuard::wrap(guard(), Recorder::default());
        let params = vec![Value::from(4)];
        let rows = guarded.execute("VACUUM menu_item", &params).unwrap();
        assert_eq!(rows, 42);

        let calls = guarded.inner().calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("VACUUM menu_item".to_string(), params)]);
    }

    #[test]
    fn test_backend_errors_propagate() {
        let guarded = QueryGuard::wrap(guard(), Recorder { fail: true, ..Default::default() });
        let err = guarded.execute("VACUUM", &[]).unwrap_err();
        assert!(!err.is_blocked());
        assert_eq!(err.to_string(), "statement execution failed: connection reset");
    }

    #[test]
    fn test_deny_policy_rejects_everything() {
        let deny = Arc::new(
            StatementGuard::new(Arc::new(PatternSet::query_danger().unwrap()))
                .with_policy(RawSqlPolicy::Deny)
                .with_excerpt_len(6),
        );
        let guarded = QueryGuard::wrap(deny, Recorder::default());
        match guarded.execute("VACUUM menu_item", &[]) {
            Err(ExecuteError::RawSqlForbidden { excerpt }) => assert_eq!(excerpt, "VACUUM"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(guarded.inner().calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo", 2), "hé");
        assert_eq!(excerpt("", 10), "");
    }
}
