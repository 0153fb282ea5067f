//! HTTP surface: read API over the cache plus the same-origin proxy.
//!
//! ## URL layout
//!
//! ```text
//! GET  /api/health
//! GET  /api/services
//! GET  /api/services/{name}
//! POST /api/services/refresh
//! GET  /api/proxy/json?url=…
//! GET  /api/proxy/rss?url=…
//! ```
//!
//! The [`CancellationToken`] passed to [`run`] drives axum's graceful
//! shutdown and stops the background refresh loop.

mod api;
mod proxy;

use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::StatusCache;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::fetch::Fetcher;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler.  Cheap to clone.
#[derive(Clone, Debug)]
pub struct ServerState {
    pub cache: StatusCache,
    /// Used by the proxy handlers; never routes through the proxy itself.
    pub fetcher: Fetcher,
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/api/health",           get(api::health))
        .route("/api/services",         get(api::services))
        .route("/api/services/refresh", post(api::refresh))
        .route("/api/services/{name}",  get(api::service))
        .route("/api/proxy/json",       get(proxy::json))
        .route("/api/proxy/rss",        get(proxy::rss))
        .with_state(state)
}

// ── Server loop ───────────────────────────────────────────────────────────────

pub async fn run(config: &ServerConfig, state: ServerState, shutdown: CancellationToken) -> Result<(), AppError> {
    if let Some(period) = config.refresh_interval {
        tokio::spawn(refresh_loop(state.cache.clone(), period, shutdown.clone()));
    }

    let router = build_router(state);
    let listener = TcpListener::bind(&config.bind)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {}: {e}", config.bind)))?;

    info!(bind = %config.bind, "http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("axum server error: {e}")))?;

    info!("http server shut down");
    Ok(())
}

/// Keep the full result set warm until `shutdown` fires.
async fn refresh_loop(cache: StatusCache, period: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let state = cache.refresh().await;
                debug!(
                    services = state.data.as_ref().map_or(0, Vec::len),
                    "background refresh done"
                );
            }
        }
    }
    debug!("refresh loop stopped");
}
