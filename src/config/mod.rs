//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ShieldConfig (validated, immutable)
//!     → Shield / HttpServer built from it at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; patterns are never reloaded at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ShieldConfig;
pub use schema::{
    HeadersConfig, ListenerConfig, ObservabilityConfig, QueryGuardConfig, ScannerConfig,
    TimeoutConfig,
};
