//! Web Module
//!
//! The axum HTTP surface over the store: ping intake and the outbox
//! drain protocol, all behind the static-token middleware.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tokio::sync::Mutex;
use tracing::info;

use crate::state::Database;
use crate::types::WatchConfig;

pub mod auth;
pub mod error;
pub mod routes;

pub use error::AppError;

/// Shared state handed to every handler.
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<WatchConfig>,
}

/// Assemble the router. Unknown paths fall through to axum's default
/// 404 with no side effects.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/ping/{id}",
            get(routes::ping_handler).post(routes::ping_handler),
        )
        .route(
            "/outbox",
            get(routes::peek_outbox_handler).delete(routes::clear_outbox_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_token,
        ))
        .with_state(state)
}

/// Bind and serve until a shutdown signal arrives.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = state.config.listen_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Listening on {}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("Failed to register Ctrl+C handler");
        info!("Received shutdown signal...");
    }
}
