//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the shield.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::security::query_guard::{RawSqlPolicy, DEFAULT_EXCERPT_LEN};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ShieldConfig {
    /// Listener configuration for the host server.
    pub listener: ListenerConfig,

    /// Inbound request scanning.
    pub scanner: ScannerConfig,

    /// Raw statement guard.
    pub query_guard: QueryGuardConfig,

    /// Security response headers.
    pub headers: HeadersConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Request scanner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Scan query and body values of every request.
    pub enabled: bool,

    /// Largest body buffered for scanning, in bytes. Larger bodies get 413.
    pub max_body_bytes: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Raw statement guard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryGuardConfig {
    /// Install the guard around each request.
    pub enabled: bool,

    /// Characters of the offending statement kept in errors and logs.
    pub excerpt_len: usize,

    /// `scan` rejects dangerous statements, `deny` rejects all raw statements.
    pub policy: RawSqlPolicy,
}

impl Default for QueryGuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            excerpt_len: DEFAULT_EXCERPT_LEN,
            policy: RawSqlPolicy::Scan,
        }
    }
}

/// Security header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// Add security headers to every non-rejected response.
    pub enabled: bool,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
