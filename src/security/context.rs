//! Per-request installation of the statement guard.
//!
//! The guard lives in task-local storage. Installation is a scope around one
//! request's future: it is removed when the future completes, returns early,
//! fails, panics, or is dropped. Concurrent requests run in separate tasks and
//! never observe each other's guard.
//!
//! Tasks spawned from inside a handler do not inherit the guard, and neither
//! does a bare `tokio::task::spawn_blocking`. Blocking database work must be
//! offloaded with [`spawn_blocking`] or [`ExecutionContext::execute_blocking`],
//! which carry the calling task's guard onto the blocking thread.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::security::query_guard::{ExecuteError, QueryGuard, StatementExecutor, StatementGuard};

tokio::task_local! {
    static ACTIVE_GUARD: Arc<StatementGuard>;
}

/// Run `fut` with `guard` installed for the current task.
pub async fn scope<F>(guard: Arc<StatementGuard>, fut: F) -> F::Output
where
    F: Future,
{
    ACTIVE_GUARD.scope(guard, fut).await
}

/// Run `f` with `guard` installed for the current thread of execution.
pub fn sync_scope<F, R>(guard: Arc<StatementGuard>, f: F) -> R
where
    F: FnOnce() -> R,
{
    ACTIVE_GUARD.sync_scope(guard, f)
}

/// The guard installed for the current task, if any.
pub fn current() -> Option<Arc<StatementGuard>> {
    ACTIVE_GUARD.try_with(Arc::clone).ok()
}

pub fn installed() -> bool {
    ACTIVE_GUARD.try_with(|_| ()).is_ok()
}

/// Run `f` on the blocking pool with the calling task's guard, if any, installed.
pub fn spawn_blocking<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let guard = current();
    tokio::task::spawn_blocking(move || match guard {
        Some(guard) => sync_scope(guard, f),
        None => f(),
    })
}

/// Which path a raw statement takes right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    Direct,
    Guarded,
}

/// Handle to the raw statement escape hatch.
///
/// Holds the unguarded executor and routes each call through a
/// [`QueryGuard`] whenever a guard is installed for the calling task.
pub struct ExecutionContext<E> {
    inner: Arc<E>,
}

impl<E> Clone for ExecutionContext<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: StatementExecutor> ExecutionContext<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// The unguarded executor.
    pub fn raw(&self) -> &Arc<E> {
        &self.inner
    }

    pub fn entry_point(&self) -> EntryPoint {
        if installed() {
            EntryPoint::Guarded
        } else {
            EntryPoint::Direct
        }
    }

    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<E::Rows, ExecuteError> {
        match current() {
            Some(guard) => QueryGuard::wrap(guard, Arc::clone(&self.inner)).execute(sql, params),
            None => self.inner.execute(sql, params),
        }
    }

    /// [`execute`](Self::execute) on the blocking pool, under the caller's guard.
    pub async fn execute_blocking(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<E::Rows, ExecuteError>
    where
        E: 'static,
        E::Rows: Send + 'static,
    {
        let ctx = self.clone();
        let sql = sql.into();
        spawn_blocking(move || ctx.execute(&sql, &params))
            .await
            .map_err(ExecuteError::backend)?
    }
}
