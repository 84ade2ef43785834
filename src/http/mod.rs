//! HTTP hosting of the security pipeline.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower-http layers)
//!     → request ID assigned
//!     → security::middleware (scan, guard, headers)
//!     → host application router
//! ```

pub mod server;

pub use server::{HttpServer, X_REQUEST_ID};
