//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! and applies `STATUSDECK_LOG_LEVEL` and `STATUSDECK_REGISTRY` env overrides.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;

use super::raw::RawConfig;
use super::types::*;

/// Deep-merge two TOML values.
/// Tables are merged recursively; the overlay only needs to specify keys that
/// differ from the base. For every other type (string, integer, array, …)
/// the overlay value replaces the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// fully merged `toml::Value`. `visited` carries canonicalized paths already
/// seen in this chain so circular references are caught early.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Load config from the given path, or `config/default.toml`, then apply env-var overrides.
/// If no path is given and `config/default.toml` does not exist, the built-in defaults are used.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let log_level_override = env::var("STATUSDECK_LOG_LEVEL").ok();
    let registry_override = env::var("STATUSDECK_REGISTRY").ok();

    if let Some(path) = config_path {
        return load_from(
            Path::new(path),
            log_level_override.as_deref(),
            registry_override.as_deref(),
        );
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(
            default_path,
            log_level_override.as_deref(),
            registry_override.as_deref(),
        )
    } else {
        resolve(
            RawConfig::default(),
            log_level_override.as_deref(),
            registry_override.as_deref(),
        )
    }
}

/// Internal loader: accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    registry_override: Option<&str>,
) -> Result<Config, AppError> {
    let mut visited = HashSet::new();
    let merged = load_raw_merged(path, &mut visited)?;

    let parsed: RawConfig = merged
        .try_into()
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, log_level_override, registry_override)
}

fn resolve(
    raw: RawConfig,
    log_level_override: Option<&str>,
    registry_override: Option<&str>,
) -> Result<Config, AppError> {
    if raw.fetch.concurrency == 0 {
        return Err(AppError::Config("fetch.concurrency must be at least 1".into()));
    }

    let log_level = log_level_override.unwrap_or(&raw.app.log_level).to_string();
    let registry_path = expand_home(registry_override.unwrap_or(&raw.registry.path));

    Ok(Config {
        log_level,
        log_file: raw.app.log_file.as_deref().map(expand_home),
        registry_path,
        fetch: FetchConfig {
            concurrency: raw.fetch.concurrency,
            user_agent: raw.fetch.user_agent,
            timeout_cap: raw.fetch.timeout_cap_ms.map(Duration::from_millis),
            proxy: ProxyConfig {
                enabled: raw.fetch.proxy.enabled,
                base_url: raw.fetch.proxy.base_url,
            },
        },
        cache: CacheConfig {
            services_stale: Duration::from_secs(raw.cache.services_stale_secs),
            services_gc: Duration::from_secs(raw.cache.services_gc_secs),
            service_stale: Duration::from_secs(raw.cache.service_stale_secs),
            service_gc: raw.cache.service_gc_secs.map(Duration::from_secs),
        },
        server: ServerConfig {
            enabled: raw.server.enabled,
            bind: raw.server.bind,
            refresh_interval: raw
                .server
                .refresh_interval_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
        },
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const MINIMAL_TOML: &str = r#"
[app]
log_level = "warn"

[registry]
path = "data/services.json"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_minimal_config_fills_defaults() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.log_level, "warn");
        assert_eq!(cfg.registry_path, PathBuf::from("data/services.json"));
        assert_eq!(cfg.fetch.concurrency, 5);
        assert!(!cfg.fetch.proxy.enabled);
        assert_eq!(cfg.cache.services_stale, Duration::from_secs(120));
        assert_eq!(cfg.cache.services_gc, Duration::from_secs(300));
        assert_eq!(cfg.cache.service_stale, Duration::from_secs(3600));
        assert!(cfg.cache.service_gc.is_none());
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn empty_file_is_valid() {
        let f = write_toml("");
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.registry_path, PathBuf::from("config/services.json"));
    }

    #[test]
    fn fetch_and_cache_sections_parse() {
        let f = write_toml(
            r#"
[fetch]
concurrency = 8
timeout_cap_ms = 1500

[fetch.proxy]
enabled = true
base_url = "http://localhost:3000/api/proxy"

[cache]
services_stale_secs = 30
service_gc_secs = 900

[server]
refresh_interval_secs = 60
"#,
        );
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.fetch.concurrency, 8);
        assert_eq!(cfg.fetch.timeout_cap, Some(Duration::from_millis(1500)));
        assert!(cfg.fetch.proxy.enabled);
        assert_eq!(cfg.fetch.proxy.base_url, "http://localhost:3000/api/proxy");
        assert_eq!(cfg.cache.services_stale, Duration::from_secs(30));
        assert_eq!(cfg.cache.service_gc, Some(Duration::from_secs(900)));
        assert_eq!(cfg.server.refresh_interval, Some(Duration::from_secs(60)));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let f = write_toml("[fetch]\nconcurrency = 0\n");
        let msg = load_from(f.path(), None, None).unwrap_err().to_string();
        assert!(msg.contains("concurrency"));
    }

    #[test]
    fn zero_refresh_interval_disables_loop() {
        let f = write_toml("[server]\nrefresh_interval_secs = 0\n");
        let cfg = load_from(f.path(), None, None).unwrap();
        assert!(cfg.server.refresh_interval.is_none());
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), None, None);
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn env_overrides_apply() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("debug"), Some("/tmp/registry.json")).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.registry_path, PathBuf::from("/tmp/registry.json"));
    }

    #[test]
    fn base_chain_merges_tables() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("base.toml"),
            "[fetch]\nconcurrency = 3\nuser_agent = \"base-agent\"\n",
        )
        .unwrap();
        let overlay = dir.path().join("prod.toml");
        fs::write(&overlay, "[meta]\nbase = \"base.toml\"\n\n[fetch]\nconcurrency = 10\n").unwrap();

        let cfg = load_from(&overlay, None, None).unwrap();
        assert_eq!(cfg.fetch.concurrency, 10);
        assert_eq!(cfg.fetch.user_agent, "base-agent");
    }

    #[test]
    fn circular_base_detected() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.toml");
        let b = dir.path().join("b.toml");
        fs::write(&a, "[meta]\nbase = \"b.toml\"\n").unwrap();
        fs::write(&b, "[meta]\nbase = \"a.toml\"\n").unwrap();

        let msg = load_from(&a, None, None).unwrap_err().to_string();
        assert!(msg.contains("circular"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.statusdeck/services.json");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with("services.json"));
    }

    #[test]
    fn absolute_path_unchanged() {
        assert_eq!(expand_home("/absolute/path"), PathBuf::from("/absolute/path"));
    }
}
