//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs the rest of the crate
//! consumes.  Raw TOML deserialization types live in `raw.rs`.

use std::path::PathBuf;
use std::time::Duration;

// ── Fetch ────────────────────────────────────────────────────────────────────

/// Same-origin proxy routing for upstream requests.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// When `false`, every upstream URL is fetched directly.
    pub enabled: bool,
    /// Proxy mount point, e.g. `http://127.0.0.1:8080/api/proxy`.
    pub base_url: String,
}

/// Upstream fetch behaviour shared by every provider.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum dispatch calls in flight during a fan-out pass.
    pub concurrency: usize,
    pub user_agent: String,
    /// Upper bound applied to each provider's built-in timeout.
    pub timeout_cap: Option<Duration>,
    pub proxy: ProxyConfig,
}

// ── Cache ────────────────────────────────────────────────────────────────────

/// Staleness and eviction horizons for the result cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Full result set is served without refetch while younger than this.
    pub services_stale: Duration,
    /// Full result set is evicted after this long without a read.
    pub services_gc: Duration,
    pub service_stale: Duration,
    /// `None` keeps single-service entries for the life of the process.
    pub service_gc: Option<Duration>,
}

// ── Server ───────────────────────────────────────────────────────────────────

/// HTTP read API + proxy configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub enabled: bool,
    /// Socket address to bind the listener to.
    pub bind: String,
    /// Background refresh period; `None` disables the warm-up loop.
    pub refresh_interval: Option<Duration>,
}

// ── Top-level ────────────────────────────────────────────────────────────────

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Optional log file; stderr when unset.
    pub log_file: Option<PathBuf>,
    /// Path to the JSON service registry (already expanded, no `~`).
    pub registry_path: PathBuf,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
}
