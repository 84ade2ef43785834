//! Security response headers.
//!
//! Applied to every response except scanner rejections, including responses
//! produced by outer layers (timeouts, body limits). Existing values are
//! overwritten.

use axum::{
    body::Body,
    http::{
        header::{self, HeaderName},
        HeaderMap, HeaderValue, Request,
    },
    middleware::Next,
    response::Response,
};

use crate::security::middleware::BlockedRequest;

/// The fixed header set, in the order it is applied.
pub const SECURITY_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::X_XSS_PROTECTION, "1; mode=block"),
    (
        header::CONTENT_SECURITY_POLICY,
        "default-src 'self'; script-src 'self'; object-src 'none'",
    ),
    (header::REFERRER_POLICY, "same-origin"),
];

pub fn apply_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

/// Middleware adding the header set to every response not marked [`BlockedRequest`].
pub async fn security_headers(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    if response.extensions().get::<BlockedRequest>().is_none() {
        apply_security_headers(response.headers_mut());
    }
    response
}
