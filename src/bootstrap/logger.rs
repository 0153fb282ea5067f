//! Logging setup via tracing-subscriber.
//!
//! [`init`] runs once, after config and CLI flags have settled the level.
//! A bare level such as `"debug"` applies everywhere except the HTTP stack,
//! which stays at `warn`.  Full `EnvFilter` directives pass through as-is.

use std::fs::{self, OpenOptions};
use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::AppError;

/// Crates whose output is capped at `warn` under a bare level.
const QUIET_DEPS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Install the global subscriber.
///
/// With `prefer_level` (a `-v` flag was given) `level` wins over `RUST_LOG`;
/// otherwise `RUST_LOG` wins and `level` is the fallback.  Output goes to
/// `log_file` when set, stderr otherwise.
pub fn init(level: &str, prefer_level: bool, log_file: Option<&Path>) -> Result<(), AppError> {
    let filter = build_filter(level, prefer_level)?;
    let writer = match log_file {
        Some(path) => file_writer(path)?,
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Expand a bare level into per-crate directives; leave anything else alone.
pub fn directives(level: &str) -> String {
    let level = level.trim();
    if parse_level(level).is_err() || level.eq_ignore_ascii_case("off") {
        return level.to_string();
    }
    let mut out = level.to_ascii_lowercase();
    for dep in QUIET_DEPS {
        out.push_str(&format!(",{dep}=warn"));
    }
    out
}

fn build_filter(level: &str, prefer_level: bool) -> Result<EnvFilter, AppError> {
    let configured = directives(level);
    if prefer_level {
        EnvFilter::try_new(&configured).or_else(|level_err| {
            EnvFilter::try_from_default_env().map_err(|env_err| {
                AppError::Logger(format!(
                    "invalid log level '{level}': {level_err}; RUST_LOG unusable: {env_err}"
                ))
            })
        })
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&configured))
            .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))
    }
}

fn file_writer(path: &Path) -> Result<BoxMakeWriter, AppError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::Logger(format!("cannot create log directory '{}': {e}", dir.display()))
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::Logger(format!("cannot open log file '{}': {e}", path.display())))?;
    Ok(BoxMakeWriter::new(file))
}

/// Validate a bare level string.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}

/// `-v` count to level: warn, info, debug, then trace from `-vvvv` on.
pub fn verbosity_level(verbosity: u8) -> Option<&'static str> {
    match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    }
}
