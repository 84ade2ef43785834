//! Compiled injection signatures.
//!
//! # Responsibilities
//! - Hold the request-surface signatures (XSS, SQLi, protocol injection)
//! - Hold the query-danger keyword vocabulary for raw statements
//! - Answer "does this text match" without side effects
//!
//! # Design Decisions
//! - Patterns compile once at startup; a malformed source aborts startup
//! - All patterns are case-insensitive
//! - Declaration order is kept so diagnostics name the same threat every time

use regex::{Match, Regex, RegexBuilder};
use serde::Serialize;

use crate::error::ShieldError;

/// Category of attack a pattern detects. Used for logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatClass {
    Xss,
    UnionSqli,
    BooleanSqli,
    DropTable,
    InsertInto,
    FrameInjection,
    ProtocolInjection,
    SqlKeyword,
}

impl ThreatClass {
    /// Stable identifier for metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatClass::Xss => "xss",
            ThreatClass::UnionSqli => "union_sqli",
            ThreatClass::BooleanSqli => "boolean_sqli",
            ThreatClass::DropTable => "drop_table",
            ThreatClass::InsertInto => "insert_into",
            ThreatClass::FrameInjection => "frame_injection",
            ThreatClass::ProtocolInjection => "protocol_injection",
            ThreatClass::SqlKeyword => "sql_keyword",
        }
    }
}

impl std::fmt::Display for ThreatClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreatClass::Xss => write!(f, "Cross-Site Scripting"),
            ThreatClass::UnionSqli => write!(f, "UNION-based SQL Injection"),
            ThreatClass::BooleanSqli => write!(f, "Boolean-based SQL Injection"),
            ThreatClass::DropTable => write!(f, "DROP TABLE Statement"),
            ThreatClass::InsertInto => write!(f, "INSERT INTO Statement"),
            ThreatClass::FrameInjection => write!(f, "Frame Injection"),
            ThreatClass::ProtocolInjection => write!(f, "JavaScript Protocol Injection"),
            ThreatClass::SqlKeyword => write!(f, "Dangerous SQL Keyword"),
        }
    }
}

/// Signatures checked against every request's parameter values.
pub const REQUEST_SURFACE: &[(ThreatClass, &str)] = &[
    (ThreatClass::Xss, r"(?s)<script.*?>.*?</script>"),
    (ThreatClass::UnionSqli, r"union.*select.*\("),
    (ThreatClass::BooleanSqli, r"\bor\b.+?=.+"),
    (ThreatClass::DropTable, r"\bdrop\s+table\b"),
    (ThreatClass::InsertInto, r"\binsert\s+into\b"),
    (ThreatClass::FrameInjection, r"<\s*iframe\b"),
    (ThreatClass::ProtocolInjection, r"javascript\s*:"),
];

/// Keyword vocabulary rejected in raw statement text.
pub const QUERY_DANGER: &[(ThreatClass, &str)] = &[(
    ThreatClass::SqlKeyword,
    r"\b(union|select|insert|update|delete|drop|alter|create|exec|script|declare|truncate|pg_catalog|information_schema|pg_sleep)\b",
)];

/// A compiled matcher labelled with the threat it detects.
#[derive(Debug, Clone)]
pub struct Pattern {
    threat: ThreatClass,
    regex: Regex,
}

impl Pattern {
    /// Compile a case-insensitive pattern.
    pub fn new(threat: ThreatClass, source: &str) -> Result<Self, ShieldError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| ShieldError::PatternCompile {
                threat,
                source_text: source.to_string(),
                source: e,
            })?;
        Ok(Self { threat, regex })
    }

    pub fn threat(&self) -> ThreatClass {
        self.threat
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Leftmost match in `text`.
    pub fn find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.regex.find(text)
    }
}

/// An ordered collection of patterns. Any single match counts.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile every source, failing on the first malformed one.
    pub fn compile(sources: &[(ThreatClass, &str)]) -> Result<Self, ShieldError> {
        let patterns = sources
            .iter()
            .map(|(threat, source)| Pattern::new(*threat, source))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// The set applied to inbound request data.
    pub fn request_surface() -> Result<Self, ShieldError> {
        Self::compile(REQUEST_SURFACE)
    }

    /// The set applied to raw statement text.
    pub fn query_danger() -> Result<Self, ShieldError> {
        Self::compile(QUERY_DANGER)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    /// First matching pattern in declaration order.
    pub fn first_match(&self, text: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.is_match(text))
    }

    /// First matching pattern in declaration order, with where it matched.
    pub fn find<'t>(&self, text: &'t str) -> Option<(&Pattern, Match<'t>)> {
        self.patterns
            .iter()
            .find_map(|p| p.find(text).map(|m| (p, m)))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }
}
