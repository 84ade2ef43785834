//! Request pipeline: scan, guarded handling, response headers.
//!
//! ```text
//! request
//!     → buffer body, build RequestSnapshot
//!     → RequestScanner
//!         Block → 403 "Malicious request blocked." (terminal, marked BlockedRequest)
//!         Allow → install StatementGuard for this task
//!               → downstream handler
//!               → guard removed
//! ```
//!
//! Security headers are added by an outer layer
//! ([`security_headers`](crate::security::headers::security_headers)) so that
//! responses produced outside the shield, such as 408 and 413, carry them too.

use std::error::Error as StdError;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use http_body_util::LengthLimitError;

use crate::config::ShieldConfig;
use crate::error::ShieldError;
use crate::observability::metrics;
use crate::security::context;
use crate::security::patterns::PatternSet;
use crate::security::query_guard::StatementGuard;
use crate::security::scanner::{is_multipart, RequestScanner, RequestSnapshot, Verdict};

/// Body of every rejected request.
pub const BLOCKED_MESSAGE: &str = "Malicious request blocked.";

/// Response extension marking a request rejected by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockedRequest;

/// Shared state of the request pipeline.
#[derive(Debug)]
pub struct Shield {
    scanner: RequestScanner,
    statement_guard: Arc<StatementGuard>,
    scan_enabled: bool,
    guard_enabled: bool,
    max_body_bytes: usize,
}

impl Shield {
    /// Compile both pattern sets. Fails if any pattern is malformed.
    pub fn from_config(config: &ShieldConfig) -> Result<Self, ShieldError> {
        let surface = Arc::new(PatternSet::request_surface()?);
        let danger = Arc::new(PatternSet::query_danger()?);

        tracing::info!(
            request_patterns = surface.len(),
            statement_patterns = danger.len(),
            raw_sql_policy = ?config.query_guard.policy,
            "Pattern sets compiled"
        );

        Ok(Self {
            scanner: RequestScanner::new(surface),
            statement_guard: Arc::new(
                StatementGuard::new(danger)
                    .with_excerpt_len(config.query_guard.excerpt_len)
                    .with_policy(config.query_guard.policy),
            ),
            scan_enabled: config.scanner.enabled,
            guard_enabled: config.query_guard.enabled,
            max_body_bytes: config.scanner.max_body_bytes,
        })
    }

    pub fn scanner(&self) -> &RequestScanner {
        &self.scanner
    }

    pub fn statement_guard(&self) -> &Arc<StatementGuard> {
        &self.statement_guard
    }
}

/// Middleware function for the full request pipeline.
pub async fn shield_middleware(
    State(shield): State<Arc<Shield>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let request = if shield.scan_enabled {
        match scan_request(&shield, request).await {
            Ok(request) => request,
            Err(response) => return response,
        }
    } else {
        request
    };

    if shield.guard_enabled {
        context::scope(Arc::clone(&shield.statement_guard), next.run(request)).await
    } else {
        next.run(request).await
    }
}

/// Buffer the body, scan all values, and hand back a replayable request.
async fn scan_request(shield: &Shield, request: Request<Body>) -> Result<Request<Body>, Response> {
    let (parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let bytes = match body::to_bytes(body, shield.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) if is_length_limit(&e) => {
            tracing::warn!(request_id = %request_id, limit = shield.max_body_bytes, "Request body too large");
            metrics::record_request("too_large");
            return Err((StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response());
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request body unreadable");
            metrics::record_request("unreadable");
            return Err((StatusCode::BAD_REQUEST, "Request body unreadable").into_response());
        }
    };

    let mut snapshot = RequestSnapshot::from_query(parts.uri.query());
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    match content_type {
        Some(ct) if is_multipart(content_type) => snapshot.push_multipart(ct, bytes.clone()).await,
        _ => snapshot.push_body(content_type, &bytes),
    }

    match shield.scanner.scan(&snapshot) {
        Verdict::Allow => {
            metrics::record_request("allowed");
            Ok(Request::from_parts(parts, Body::from(bytes)))
        }
        Verdict::Block(reason) => {
            tracing::warn!(
                request_id = %request_id,
                method = %parts.method,
                path = %parts.uri.path(),
                threat = %reason.threat,
                excerpt = %reason.excerpt,
                "Malicious request blocked"
            );
            metrics::record_request("blocked");
            metrics::record_request_blocked(reason.threat.as_str());
            Err((StatusCode::FORBIDDEN, Extension(BlockedRequest), BLOCKED_MESSAGE).into_response())
        }
    }
}

fn is_length_limit(err: &axum::Error) -> bool {
    std::iter::successors(Some(err as &(dyn StdError + 'static)), |e: &&(dyn StdError + 'static)| (*e).source())
        .any(|e| e.is::<LengthLimitError>())
}
