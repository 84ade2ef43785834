//! Inbound request inspection.
//!
//! # Responsibilities
//! - Collect every user-supplied string value of a request (query + body)
//! - Flatten them into one text blob
//! - Evaluate the blob against the request-surface patterns
//!
//! # Design Decisions
//! - Pure predicate: no I/O, no shared state
//! - Undecodable input is scanned as lossy text, never rejected for encoding
//! - Form, multipart and JSON bodies carry fields; other bodies are not scanned
//! - Multipart file parts are binary data and are skipped

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart},
    http::{header, Request},
};
use serde::Serialize;
use serde_json::Value;

use crate::security::patterns::{PatternSet, ThreatClass};

/// Maximum characters of the offending text kept in a block reason.
const REASON_EXCERPT_CHARS: usize = 200;

/// All string values carried by one request, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestSnapshot {
    values: Vec<String>,
}

impl RequestSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a URL query string (without the leading `?`).
    pub fn from_query(query: Option<&str>) -> Self {
        let mut snapshot = Self::new();
        if let Some(query) = query {
            snapshot.push_form(query.as_bytes());
        }
        snapshot
    }

    /// Add one value as-is.
    pub fn push(&mut self, value: impl Into<String>) {
        self.values.push(value.into());
    }

    /// Add the field values of a request body according to its content type.
    pub fn push_body(&mut self, content_type: Option<&str>, body: &[u8]) {
        if body.is_empty() {
            return;
        }

        let media = content_type.map(media_type);
        match media.as_deref() {
            Some("application/x-www-form-urlencoded") => self.push_form(body),
            Some(mt) if mt == "application/json" || mt.ends_with("+json") => {
                match serde_json::from_slice::<Value>(body) {
                    Ok(doc) => self.push_json(&doc),
                    // Unparseable JSON is still untrusted text.
                    Err(_) => self.push(String::from_utf8_lossy(body)),
                }
            }
            _ => {}
        }
    }

    /// Add the text field values of a `multipart/form-data` body.
    ///
    /// A body that does not parse as multipart is scanned as lossy text.
    pub async fn push_multipart(&mut self, content_type: &str, body: Bytes) {
        if body.is_empty() {
            return;
        }
        if self.try_push_multipart(content_type, body.clone()).await.is_none() {
            self.push(String::from_utf8_lossy(&body));
        }
    }

    async fn try_push_multipart(&mut self, content_type: &str, body: Bytes) -> Option<()> {
        let request = Request::builder()
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .ok()?;
        let mut multipart = Multipart::from_request(request, &()).await.ok()?;

        while let Some(field) = multipart.next_field().await.ok()? {
            if field.file_name().is_some() {
                continue;
            }
            let value = field.bytes().await.ok()?;
            self.push(String::from_utf8_lossy(&value));
        }
        Some(())
    }

    fn push_form(&mut self, encoded: &[u8]) {
        self.values.extend(
            url::form_urlencoded::parse(encoded).map(|(_, value)| value.into_owned()),
        );
    }

    fn push_json(&mut self, value: &Value) {
        match value {
            Value::String(s) => self.push(s.clone()),
            Value::Array(items) => items.iter().for_each(|v| self.push_json(v)),
            Value::Object(map) => map.values().for_each(|v| self.push_json(v)),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All values joined by a single space.
    pub fn text(&self) -> String {
        self.values.join(" ")
    }
}

/// Whether a `Content-Type` names a multipart form body.
pub fn is_multipart(content_type: Option<&str>) -> bool {
    content_type
        .map(media_type)
        .is_some_and(|media| media == "multipart/form-data")
}

/// Lowercased media type without parameters (`text/html; charset=utf-8` -> `text/html`).
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Why a request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockReason {
    /// Threat class of the first matching pattern.
    pub threat: ThreatClass,
    /// Scanned text from the start of the match onwards, bounded.
    pub excerpt: String,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in {:?}", self.threat, self.excerpt)
    }
}

/// Outcome of a request scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Allow,
    Block(BlockReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Block(_))
    }
}

/// Evaluates request snapshots against the request-surface patterns.
#[derive(Debug, Clone)]
pub struct RequestScanner {
    patterns: Arc<PatternSet>,
}

impl RequestScanner {
    pub fn new(patterns: Arc<PatternSet>) -> Self {
        Self { patterns }
    }

    pub fn scan(&self, snapshot: &RequestSnapshot) -> Verdict {
        if snapshot.is_empty() {
            return Verdict::Allow;
        }

        let text = snapshot.text();
        match self.patterns.find(&text) {
            Some((pattern, found)) => Verdict::Block(BlockReason {
                threat: pattern.threat(),
                excerpt: text[found.start()..].chars().take(REASON_EXCERPT_CHARS).collect(),
            }),
            None => Verdict::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> RequestScanner {
        RequestScanner::new(Arc::new(PatternSet::request_surface().unwrap()))
    }

    #[test]
    fn test_empty_request_is_allowed() {
        assert_eq!(scanner().scan(&RequestSnapshot::from_query(None)), Verdict::Allow);
        assert_eq!(scanner().scan(&RequestSnapshot::from_query(Some(""))), Verdict::Allow);
    }

    #[test]
    fn test_query_values_are_decoded() {
        let snapshot = RequestSnapshot::from_query(Some("q=1%20OR%201%3D1&page=2"));
        assert_eq!(snapshot.values(), &["1 OR 1=1".to_string(), "2".to_string()]);

        match scanner().scan(&snapshot) {
            Verdict::Block(reason) => assert_eq!(reason.threat, ThreatClass::BooleanSqli),
            Verdict::Allow => panic!("tautology should be blocked"),
        }
    }

    #[test]
    fn test_names_are_not_scanned() {
        let snapshot = RequestSnapshot::from_query(Some("javascript%3A=ok"));
        assert!(scanner().scan(&snapshot).is_allowed());
    }

    #[test]
    fn test_script_in_any_position_blocks() {
        for position in 0..5 {
            let mut snapshot = RequestSnapshot::new();
            for i in 0..5 {
                if i == position {
                    snapshot.push("<SCRIPT>steal()</script>");
                } else {
                    snapshot.push(format!("value {i}"));
                }
            }
            assert!(scanner().scan(&snapshot).is_blocked(), "position {position}");
        }
    }

    #[test]
    fn test_form_body() {
        let mut snapshot = RequestSnapshot::new();
        snapshot.push_body(
            Some("application/x-www-form-urlencoded; charset=UTF-8"),
            b"comment=great+food&rating=5",
        );
        assert_eq!(snapshot.text(), "great food 5");
        assert!(scanner().scan(&snapshot).is_allowed());
    }

    #[test]
    fn test_json_body_string_leaves_only() {
        let mut snapshot = RequestSnapshot::new();
        snapshot.push_body(
            Some("application/json"),
            br#"{"party": 4, "vip": true, "notes": ["window seat", {"extra": "<iframe src=x>"}]}"#,
        );
        assert_eq!(snapshot.values().len(), 2);
        match scanner().scan(&snapshot) {
            Verdict::Block(reason) => assert_eq!(reason.threat, ThreatClass::FrameInjection),
            Verdict::Allow => panic!("nested iframe should be blocked"),
        }
    }

    #[test]
    fn test_malformed_json_is_scanned_as_text() {
        let mut snapshot = RequestSnapshot::new();
        snapshot.push_body(Some("application/json"), b"{\"a\": \"javascript:go()\"");
        assert!(scanner().scan(&snapshot).is_blocked());
    }

    #[test]
    fn test_invalid_utf8_is_opaque_text() {
        let mut snapshot = RequestSnapshot::new();
        snapshot.push_body(
            Some("application/x-www-form-urlencoded"),
            b"note=%FF%00drop%20table%20users",
        );
        assert!(scanner().scan(&snapshot).is_blocked());
    }

    #[test]
    fn test_other_bodies_are_ignored() {
        let mut snapshot = RequestSnapshot::new();
        snapshot.push_body(Some("text/plain"), b"<script>x</script>");
        snapshot.push_body(None, b"<script>x</script>");
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_block_reason_excerpt_is_bounded() {
        let mut snapshot = RequestSnapshot::new();
        snapshot.push(format!("1 OR 1={}", "a".repeat(500)));
        match scanner().scan(&snapshot) {
            Verdict::Block(reason) => {
                assert!(reason.excerpt.starts_with("OR 1="));
                assert_eq!(reason.excerpt.chars().count(), REASON_EXCERPT_CHARS);
            }
            Verdict::Allow => panic!("should block"),
        }
    }

    #[test]
    fn test_excerpt_starts_at_match_after_long_benign_value() {
        let mut snapshot = RequestSnapshot::new();
        snapshot.push("a".repeat(300));
        snapshot.push("<script>x</script>");
        match scanner().scan(&snapshot) {
            Verdict::Block(reason) => {
                assert_eq!(reason.threat, ThreatClass::Xss);
                assert_eq!(reason.excerpt, "<script>x</script>");
            }
            Verdict::Allow => panic!("script should be blocked"),
        }
    }

    const BOUNDARY_TYPE: &str = "multipart/form-data; boundary=XX";

    #[tokio::test]
    async fn test_multipart_text_fields_scanned() {
        let body = "--XX\r\n\
            Content-Disposition: form-data; name=\"name\"\r\n\r\n\
            ann\r\n\
            --XX\r\n\
            Content-Disposition: form-data; name=\"comment\"\r\n\r\n\
            <script>steal()</script>\r\n\
            --XX--\r\n";
        assert!(is_multipart(Some(BOUNDARY_TYPE)));

        let mut snapshot = RequestSnapshot::new();
        snapshot.push_multipart(BOUNDARY_TYPE, Bytes::from(body)).await;
        assert_eq!(snapshot.values(), &["ann".to_string(), "<script>steal()</script>".to_string()]);
        assert!(scanner().scan(&snapshot).is_blocked());
    }

    #[tokio::test]
    async fn test_multipart_file_parts_skipped() {
        let body = "--XX\r\n\
            Content-Disposition: form-data; name=\"photo\"; filename=\"menu.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            javascript:binary\r\n\
            --XX\r\n\
            Content-Disposition: form-data; name=\"caption\"\r\n\r\n\
            dessert\r\n\
            --XX--\r\n";

        let mut snapshot = RequestSnapshot::new();
        snapshot.push_multipart(BOUNDARY_TYPE, Bytes::from(body)).await;
        assert_eq!(snapshot.values(), &["dessert".to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_multipart_is_scanned_as_text() {
        let mut snapshot = RequestSnapshot::new();
        snapshot
            .push_multipart("multipart/form-data", Bytes::from_static(b"<iframe src=x>"))
            .await;
        assert!(scanner().scan(&snapshot).is_blocked());
    }
}
