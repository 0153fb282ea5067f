//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape, the serde target before resolution.
#[derive(Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub app: RawApp,
    #[serde(default)]
    pub registry: RawRegistry,
    #[serde(default)]
    pub fetch: RawFetch,
    #[serde(default)]
    pub cache: RawCache,
    #[serde(default)]
    pub server: RawServer,
}

#[derive(Deserialize)]
pub(super) struct RawApp {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for RawApp {
    fn default() -> Self {
        Self { log_level: default_log_level(), log_file: None }
    }
}

#[derive(Deserialize)]
pub(super) struct RawRegistry {
    #[serde(default = "default_registry_path")]
    pub path: String,
}

impl Default for RawRegistry {
    fn default() -> Self {
        Self { path: default_registry_path() }
    }
}

// ── Fetch ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawFetch {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub timeout_cap_ms: Option<u64>,
    #[serde(default)]
    pub proxy: RawProxy,
}

impl Default for RawFetch {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
            timeout_cap_ms: None,
            proxy: RawProxy::default(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawProxy {
    /// Defaults to `false`: upstream URLs are fetched directly.
    #[serde(default = "default_false")]
    pub enabled: bool,
    #[serde(default = "default_proxy_base_url")]
    pub base_url: String,
}

impl Default for RawProxy {
    fn default() -> Self {
        Self { enabled: false, base_url: default_proxy_base_url() }
    }
}

// ── Cache ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawCache {
    #[serde(default = "default_services_stale_secs")]
    pub services_stale_secs: u64,
    #[serde(default = "default_services_gc_secs")]
    pub services_gc_secs: u64,
    #[serde(default = "default_service_stale_secs")]
    pub service_stale_secs: u64,
    #[serde(default)]
    pub service_gc_secs: Option<u64>,
}

impl Default for RawCache {
    fn default() -> Self {
        Self {
            services_stale_secs: default_services_stale_secs(),
            services_gc_secs: default_services_gc_secs(),
            service_stale_secs: default_service_stale_secs(),
            service_gc_secs: None,
        }
    }
}

// ── Server ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawServer {
    /// Defaults to `false`: the `serve` command enables it explicitly.
    #[serde(default = "default_false")]
    pub enabled: bool,
    #[serde(default = "default_http_bind")]
    pub bind: String,
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,
}

impl Default for RawServer {
    fn default() -> Self {
        Self { enabled: false, bind: default_http_bind(), refresh_interval_secs: None }
    }
}

// ── Defaults ─────────────────────────────────────────────────────────────────

pub(super) fn default_log_level() -> String { "info".to_string() }
pub(super) fn default_registry_path() -> String { "config/services.json".to_string() }
pub(super) fn default_concurrency() -> usize { 5 }
pub(super) fn default_user_agent() -> String {
    format!("statusdeck/{}", env!("CARGO_PKG_VERSION"))
}
pub(super) fn default_proxy_base_url() -> String { "http://127.0.0.1:8080/api/proxy".to_string() }
pub(super) fn default_services_stale_secs() -> u64 { 120 }
pub(super) fn default_services_gc_secs() -> u64 { 300 }
pub(super) fn default_service_stale_secs() -> u64 { 3600 }
pub(super) fn default_http_bind() -> String { "127.0.0.1:8080".to_string() }

fn default_false() -> bool {
    false
}
