//! Handlers for the `/api/services*` read API and `/api/health`.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::ServerState;

/// Build a JSON error response body.
pub(super) fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

/// GET /api/health: liveness plus a cache summary.  Never fetches.
pub(super) async fn health(State(state): State<ServerState>) -> Response {
    let services = state.cache.services_state();
    let body = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "services": state.cache.registry().len(),
        "cacheEntries": state.cache.entry_count(),
        "fetchedAt": services.fetched_at,
        "isFetching": services.is_fetching,
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// GET /api/services
pub(super) async fn services(State(state): State<ServerState>) -> Response {
    (StatusCode::OK, Json(state.cache.get_all().await)).into_response()
}

/// GET /api/services/{name}
pub(super) async fn service(State(state): State<ServerState>, Path(name): Path<String>) -> Response {
    match state.cache.get_service(&name).await {
        Some(query) => (StatusCode::OK, Json(query)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            json_error("not_found", format!("no service named '{name}'")),
        )
            .into_response(),
    }
}

/// POST /api/services/refresh: forced full pass.
pub(super) async fn refresh(State(state): State<ServerState>) -> Response {
    (StatusCode::OK, Json(state.cache.refresh().await)).into_response()
}
