//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap a host application router with the security pipeline
//! - Wire up middleware (tracing, security headers, timeout, body limit, request ID)
//! - Bind server to listener and shut down gracefully

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::HeaderName, middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ShieldConfig;
use crate::error::ShieldError;
use crate::security::{security_headers, shield_middleware, Shield};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// HTTP server hosting an application behind the shield.
pub struct HttpServer {
    router: Router,
    config: ShieldConfig,
    shield: Arc<Shield>,
}

impl HttpServer {
    /// Compile the shield and wrap `app`. Fails on malformed patterns.
    pub fn new(config: ShieldConfig, app: Router) -> Result<Self, ShieldError> {
        let shield = Arc::new(Shield::from_config(&config)?);
        let router = Self::build_router(&config, Arc::clone(&shield), app);
        Ok(Self {
            router,
            config,
            shield,
        })
    }

    /// Layer order, outermost first: request ID, trace, security headers,
    /// timeout, body limit, shield.
    #[allow(deprecated)]
    fn build_router(config: &ShieldConfig, shield: Arc<Shield>, app: Router) -> Router {
        // Oversized Content-Length is refused here; chunked bodies are capped by the shield.
        let router = app
            .layer(middleware::from_fn_with_state(shield, shield_middleware))
            .layer(RequestBodyLimitLayer::new(config.scanner.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        let router = if config.headers.enabled {
            router.layer(middleware::from_fn(security_headers))
        } else {
            router
        };

        router
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// The fully layered router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn shield(&self) -> &Arc<Shield> {
        &self.shield
    }

    pub fn config(&self) -> &ShieldConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
