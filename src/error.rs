//! Startup-time error types.
//!
//! Request-time rejections are not errors of this kind: a blocked request is a
//! [`Verdict`](crate::security::Verdict) and a blocked statement is an
//! [`ExecuteError`](crate::security::ExecuteError).

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::security::ThreatClass;

/// Errors that prevent the shield from starting.
#[derive(Debug, Error)]
pub enum ShieldError {
    /// A pattern source failed to compile.
    #[error("failed to compile {threat} pattern `{source_text}`: {source}")]
    PatternCompile {
        threat: ThreatClass,
        source_text: String,
        #[source]
        source: regex::Error,
    },

    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Binding or serving failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
