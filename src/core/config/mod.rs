//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `STATUSDECK_LOG_LEVEL` and `STATUSDECK_REGISTRY` overrides.
//!
//! # Module layout
//!
//! - **types**: Public configuration structs (`Config`, `FetchConfig`,
//!   `CacheConfig`, …).
//! - **raw**: Raw TOML deserialization types (`RawConfig`, `RawFetch`, …).
//!   These mirror the file shape and use serde defaults; kept private.
//! - **load**: Loading logic: `merge_toml`, `load_raw_merged`, `load`,
//!   `load_from`, `expand_home`.

mod load;
mod raw;
mod types;

pub use load::{expand_home, load, load_from};
pub use types::*;

impl Config {
    /// Safe `Config` for tests: direct fetches, short timeouts, no server.
    pub fn test_default() -> Self {
        Self {
            log_level: "info".into(),
            log_file: None,
            registry_path: "config/services.json".into(),
            fetch: FetchConfig {
                concurrency: raw::default_concurrency(),
                user_agent: raw::default_user_agent(),
                timeout_cap: Some(std::time::Duration::from_secs(2)),
                proxy: ProxyConfig {
                    enabled: false,
                    base_url: raw::default_proxy_base_url(),
                },
            },
            cache: CacheConfig {
                services_stale: std::time::Duration::from_secs(raw::default_services_stale_secs()),
                services_gc: std::time::Duration::from_secs(raw::default_services_gc_secs()),
                service_stale: std::time::Duration::from_secs(raw::default_service_stale_secs()),
                service_gc: None,
            },
            server: ServerConfig {
                enabled: false,
                bind: raw::default_http_bind(),
                refresh_interval: None,
            },
        }
    }
}
