//! request-shield demo host.
//!
//! Serves a minimal application behind the security pipeline:
//!
//! ```text
//! client → request ID → trace → timeout → body limit → shield → app
//!                                                        │
//!                                  403 on malicious input ┘
//! ```
//!
//! Routes:
//! - `GET /health` liveness probe
//! - `ANY /echo` returns the query string and body it received

use std::path::PathBuf;

use axum::{
    http::Uri,
    routing::{any, get},
    Json, Router,
};
use clap::Parser;
use serde_json::{json, Value};

use request_shield::config::{load_config, ShieldConfig};
use request_shield::lifecycle::startup;
use request_shield::observability::logging;

#[derive(Parser)]
#[command(name = "request-shield")]
#[command(about = "Serve a demo application behind the request shield", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ShieldConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        scanner = config.scanner.enabled,
        query_guard = config.query_guard.enabled,
        headers = config.headers.enabled,
        "request-shield starting"
    );

    startup::run(config, demo_app()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_app() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/echo", any(echo))
}

async fn echo(uri: Uri, body: String) -> Json<Value> {
    Json(json!({
        "path": uri.path(),
        "query": uri.query(),
        "body": body,
    }))
}
