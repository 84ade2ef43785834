//! Startup orchestration.
//!
//! Order matters: the shield (and its patterns) is built before anything
//! binds, so a malformed pattern set never serves traffic.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::ShieldConfig;
use crate::error::ShieldError;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Build, bind and serve `app` behind the shield until Ctrl+C.
pub async fn run(config: ShieldConfig, app: Router) -> Result<(), ShieldError> {
    let server = HttpServer::new(config.clone(), app)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let mut serving = tokio::spawn(server.run(listener, server_shutdown));

    let joined = tokio::select! {
        joined = &mut serving => joined,
        _ = signals::wait_for_signal(&shutdown) => serving.await,
    };

    match joined {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "Server task failed"),
    }
    Ok(())
}
