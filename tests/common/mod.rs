//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use axum::{
    body::{self, Body},
    http::{Request, Response},
    Router,
};
use request_shield::security::{ExecuteError, StatementExecutor};
use request_shield::{HttpServer, ShieldConfig};
use serde_json::Value;
use tower::ServiceExt;

/// Raw statement executor that records what reached it.
#[derive(Default)]
pub struct RecordingExecutor {
    pub statements: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl RecordingExecutor {
    pub fn executed(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

impl StatementExecutor for RecordingExecutor {
    type Rows = Vec<Value>;

    fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, ExecuteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.statements.lock().unwrap().push(sql.to_string());
        Ok(params.to_vec())
    }
}

/// Executor whose every call fails at the database.
pub struct FailingExecutor;

#[derive(Debug, thiserror::Error)]
#[error("database is down")]
pub struct DatabaseDown;

impl StatementExecutor for FailingExecutor {
    type Rows = ();

    fn execute(&self, _sql: &str, _params: &[Value]) -> Result<(), ExecuteError> {
        Err(ExecuteError::backend(DatabaseDown))
    }
}

/// Wrap `app` with the full server stack and return the layered router.
pub fn shielded(config: ShieldConfig, app: Router) -> Router {
    HttpServer::new(config, app).unwrap().router()
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

pub fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

/// A `multipart/form-data` request with text fields only.
pub fn post_multipart(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--XX\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str("--XX--\r\n");

    Request::post(uri)
        .header("content-type", "multipart/form-data; boundary=XX")
        .body(Body::from(body))
        .unwrap()
}

pub const HEADERS: [(&str, &str); 5] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    (
        "content-security-policy",
        "default-src 'self'; script-src 'self'; object-src 'none'",
    ),
    ("referrer-policy", "same-origin"),
];

pub fn assert_security_headers(response: &Response<Body>) {
    for (name, value) in HEADERS {
        assert_eq!(
            response.headers().get(name).and_then(|v| v.to_str().ok()),
            Some(value),
            "header {name}"
        );
    }
}
