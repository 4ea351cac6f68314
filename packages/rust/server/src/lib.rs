//! HTTP API for WebClip.
//!
//! Exposes `POST /convert` (URL + template -> Markdown note), `GET /health`
//! and a service description at `GET /`. Page fetching and template
//! rendering are injected through [`AppState`].

mod api;
mod error;
mod middleware;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use webclip_core::TemplateRenderer;
use webclip_extractor::PageExtractor;
use webclip_shared::ServerConfig;

pub use api::{
    ConvertRequest, ConvertResponse, Endpoints, ErrorCode, ErrorResponse, HealthResponse,
    IndexResponse, PageSummary,
};
pub use error::ApiError;

/// Shared, immutable handler state.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<dyn PageExtractor>,
    pub renderer: Arc<dyn TemplateRenderer>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/convert", post(routes::convert))
        .layer(axum::middleware::from_fn(middleware::cors))
        .layer(axum::middleware::from_fn(middleware::trace_requests))
        .with_state(state)
}

/// Bind `host:port` and serve until Ctrl-C or SIGTERM.
///
/// After a shutdown signal, in-flight requests get `shutdown_timeout_secs`
/// to finish before the server is dropped.
pub async fn serve(config: &ServerConfig, state: AppState) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    let shutdown_started = Arc::new(Notify::new());
    let notify = shutdown_started.clone();
    let server = axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutdown signal received, draining connections");
            notify.notify_one();
        })
        .into_future();

    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    let deadline = async {
        shutdown_started.notified().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            info!("server stopped");
            result
        }
        () = deadline => {
            warn!(timeout_secs = grace.as_secs(), "connections did not drain in time, forcing shutdown");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
