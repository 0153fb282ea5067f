//! Same-origin proxy: `/api/proxy/json?url=` and `/api/proxy/rss?url=`.
//!
//! The target must be an absolute `http(s)` URL.  Upstream status, body and
//! content type are forwarded unchanged; the JSON endpoint answers 415 when
//! upstream did not send JSON.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::fetch::ProxyEndpoint;

use super::ServerState;
use super::api::json_error;

const PROXY_TIMEOUT: Duration = Duration::from_secs(10);
const ACCEPT_JSON: &str = "application/json";
const ACCEPT_FEED: &str = "application/rss+xml, application/atom+xml, text/xml;q=0.9, */*;q=0.5";

#[derive(Debug, Deserialize)]
pub(super) struct ProxyQuery {
    url: Option<String>,
}

/// GET /api/proxy/json
pub(super) async fn json(State(state): State<ServerState>, Query(query): Query<ProxyQuery>) -> Response {
    forward(&state, query, ProxyEndpoint::Json).await
}

/// GET /api/proxy/rss
pub(super) async fn rss(State(state): State<ServerState>, Query(query): Query<ProxyQuery>) -> Response {
    forward(&state, query, ProxyEndpoint::Rss).await
}

/// Parse and check the proxy target.
fn validate_target(raw: Option<&str>) -> Result<Url, String> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or("missing 'url' parameter")?;
    let url = Url::parse(raw).map_err(|e| format!("invalid url: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("url has no host".into());
    }
    Ok(url)
}

async fn forward(state: &ServerState, query: ProxyQuery, endpoint: ProxyEndpoint) -> Response {
    let target = match validate_target(query.url.as_deref()) {
        Ok(url) => url,
        Err(msg) => return (StatusCode::BAD_REQUEST, json_error("bad_request", msg)).into_response(),
    };

    let accept = match endpoint {
        ProxyEndpoint::Json => ACCEPT_JSON,
        ProxyEndpoint::Rss => ACCEPT_FEED,
    };
    let upstream = match state.fetcher.get_raw(target.as_str(), accept, PROXY_TIMEOUT).await {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %target, kind = e.kind(), error = %e, "proxy upstream failed");
            return (StatusCode::BAD_GATEWAY, json_error(e.kind(), e)).into_response();
        }
    };

    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if endpoint == ProxyEndpoint::Json && !content_type.as_deref().is_some_and(|ct| ct.to_ascii_lowercase().contains("json")) {
        debug!(url = %target, content_type = ?content_type, "proxy rejected non-json upstream");
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            json_error(
                "unsupported_media_type",
                format!("upstream content-type is {}", content_type.as_deref().unwrap_or("missing")),
            ),
        )
            .into_response();
    }

    let body: Bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(url = %target, error = %e, "proxy body read failed");
            return (StatusCode::BAD_GATEWAY, json_error("network", e)).into_response();
        }
    };

    let content_type = content_type.unwrap_or_else(|| match endpoint {
        ProxyEndpoint::Json => ACCEPT_JSON.to_string(),
        ProxyEndpoint::Rss => "application/xml".to_string(),
    });
    debug!(url = %target, %status, bytes = body.len(), "proxied");
    (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
}
