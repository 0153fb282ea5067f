//! Shared fixtures: a local upstream that serves canned status payloads.
//!
//! The first path segment picks the behaviour, the rest is ignored, so
//! `{base}/ok/github/api/v2/summary.json` is a healthy Statuspage summary
//! and still looks like one to URL sniffing.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio::net::TcpListener;

use statusdeck::config::Config;
use statusdeck::dispatch::Dispatcher;
use statusdeck::fanout::FanOut;
use statusdeck::fetch::Fetcher;

/// How long the `/slow/` route stalls; far beyond any test timeout cap.
pub const SLOW_ROUTE_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[derive(Debug)]
struct FixtureState {
    counters: Counters,
    delay: Duration,
}

/// Decrements the in-flight gauge even when the client hangs up early.
struct InFlight<'a>(&'a Counters);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Upstream {
    base: String,
    state: Arc<FixtureState>,
}

impl Upstream {
    pub async fn start() -> Self {
        Self::with_delay(Duration::ZERO).await
    }

    /// Every request waits `delay` before answering.
    pub async fn with_delay(delay: Duration) -> Self {
        let state = Arc::new(FixtureState { counters: Counters::default(), delay });
        let router = Router::new().fallback(handle).with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self { base: format!("http://{addr}"), state }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    pub fn hits(&self) -> usize {
        self.state.counters.hits.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.counters.max_in_flight.load(Ordering::SeqCst)
    }
}

async fn handle(State(state): State<Arc<FixtureState>>, uri: Uri) -> Response {
    let counters = &state.counters;
    counters.hits.fetch_add(1, Ordering::SeqCst);
    let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
    let _guard = InFlight(counters);

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    respond(uri.path()).await
}

async fn respond(path: &str) -> Response {
    let kind = path.trim_start_matches('/').split('/').next().unwrap_or_default();
    match kind {
        "ok" => json_body(summary("none", "All Systems Operational", json!([]))),
        "minor" => json_body(summary(
            "minor",
            "Minor Service Outage",
            json!([
                { "id": "api", "name": "API", "status": "degraded_performance" },
                { "id": "web", "name": "Website", "status": "operational" }
            ]),
        )),
        "fail" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
        "garbage" => ([(header::CONTENT_TYPE, "application/json")], "{\"status\": {\"indic").into_response(),
        "empty" => json_body(json!({})),
        "pair" => two_call(path, false),
        "half" => two_call(path, true),
        "html" => ([(header::CONTENT_TYPE, "text/html")], "<html><body>maintenance</body></html>").into_response(),
        "badxml" => ([(header::CONTENT_TYPE, "application/rss+xml")], "<rss><channel><item><title>").into_response(),
        "events" => json_body(json!([
            {
                "title": "Checkout unavailable",
                "type": "unavailability",
                "created_at": "2024-03-01T10:00:00Z",
                "resolved_at": null,
                "components": ["Checkout"]
            },
            {
                "title": "Login slow",
                "type": "instability",
                "created_at": "2023-12-31T10:00:00Z",
                "resolved_at": "2024-01-01",
                "components": ["Login"]
            }
        ])),
        "slow" => {
            tokio::time::sleep(SLOW_ROUTE_DELAY).await;
            json_body(summary("none", "All Systems Operational", json!([])))
        }
        _ => (StatusCode::NOT_FOUND, "no such fixture").into_response(),
    }
}

/// Instatus and Cachet endpoints.  With `second_fails` only the first call
/// of each pair (`summary.json`, `api/v1/components`) answers.
fn two_call(path: &str, second_fails: bool) -> Response {
    if path.ends_with("/summary.json") {
        json_body(json!({ "page": { "name": "Acme", "status": "UP" }, "activeIncidents": [] }))
    } else if path.ends_with("/api/v1/components") {
        json_body(json!({ "data": [{ "id": 1, "name": "API", "status": 1 }] }))
    } else if second_fails {
        (StatusCode::INTERNAL_SERVER_ERROR, "second endpoint down").into_response()
    } else if path.ends_with("/v2/components.json") {
        json_body(json!({ "components": [{ "id": "api", "name": "API", "status": "OPERATIONAL" }] }))
    } else if path.ends_with("/api/v1/incidents") {
        json_body(json!({ "data": [] }))
    } else {
        (StatusCode::NOT_FOUND, "no such fixture").into_response()
    }
}

fn summary(indicator: &str, description: &str, components: serde_json::Value) -> serde_json::Value {
    json!({
        "status": { "indicator": indicator, "description": description },
        "components": components,
    })
}

fn json_body(body: serde_json::Value) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body.to_string()).into_response()
}

// ── Pipeline builders ─────────────────────────────────────────────────────────

/// Test config with a tight timeout cap so stalled upstreams fail fast.
pub fn config(timeout_cap: Duration) -> Config {
    let mut config = Config::test_default();
    config.fetch.timeout_cap = Some(timeout_cap);
    config
}

pub fn fetcher(timeout_cap: Duration) -> Fetcher {
    Fetcher::new(&config(timeout_cap).fetch).unwrap()
}

pub fn fanout(concurrency: usize, timeout_cap: Duration) -> FanOut {
    FanOut::new(Dispatcher::new(fetcher(timeout_cap)), concurrency)
}
