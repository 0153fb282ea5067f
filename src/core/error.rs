//! Application-wide error types.
//!
//! [`AppError`] covers process-level failures (config, logger, registry,
//! server).  [`FetchError`] is the per-provider failure taxonomy; it never
//! leaves the dispatcher: every provider converts it into a fallback
//! record at its boundary.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a provider could not produce real data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// DNS, connection or TLS failure.
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("unexpected content-type: {0}")]
    ContentType(String),

    /// 2xx body that does not match the expected shape.
    #[error("schema mismatch: {0}")]
    Schema(String),

    #[error("unknown provider tag: {0}")]
    UnknownProvider(String),
}

impl FetchError {
    /// Short static label for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Timeout(_) => "timeout",
            FetchError::Status(_) => "status",
            FetchError::ContentType(_) => "content_type",
            FetchError::Schema(_) => "schema",
            FetchError::UnknownProvider(_) => "unknown_provider",
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else if err.is_decode() {
            FetchError::Schema(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn registry_error_display() {
        let e = AppError::Registry("services.json: expected array".into());
        assert!(e.to_string().starts_with("registry error"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        let _: &dyn Error = &e;
    }

    #[test]
    fn fetch_error_kinds_are_distinct() {
        let kinds = [
            FetchError::Network("refused".into()).kind(),
            FetchError::Timeout(Duration::from_secs(5)).kind(),
            FetchError::Status(503).kind(),
            FetchError::ContentType("text/html".into()).kind(),
            FetchError::Schema("missing field `status`".into()).kind(),
            FetchError::UnknownProvider("foo".into()).kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn status_error_mentions_code() {
        assert!(FetchError::Status(502).to_string().contains("502"));
    }
}
