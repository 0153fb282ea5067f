//! Same-origin proxy URL rewriting.

use reqwest::Url;

use crate::error::{AppError, FetchError};

/// Which proxy endpoint a call goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyEndpoint {
    Json,
    Rss,
}

impl ProxyEndpoint {
    fn path(self) -> &'static str {
        match self {
            ProxyEndpoint::Json => "json",
            ProxyEndpoint::Rss => "rss",
        }
    }
}

/// Proxy mount point, e.g. `http://127.0.0.1:8080/api/proxy`.
#[derive(Debug, Clone)]
pub struct ProxyRoute {
    base: Url,
}

impl ProxyRoute {
    pub fn parse(base_url: &str) -> Result<Self, AppError> {
        let base = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("invalid proxy base_url '{base_url}': {e}")))?;
        Ok(Self { base })
    }

    /// `true` when `target` is on a different origin than the proxy.
    /// Unparseable targets count as cross-origin.
    pub fn is_cross_origin(&self, target: &str) -> bool {
        match Url::parse(target) {
            Ok(url) => url.origin() != self.base.origin(),
            Err(_) => true,
        }
    }

    /// Rewrite `target` to `{base}/{json|rss}?url=<target>`.
    pub fn wrap(&self, target: &str, endpoint: ProxyEndpoint) -> Result<String, FetchError> {
        let base = self.base.as_str().trim_end_matches('/');
        let url = Url::parse_with_params(&format!("{base}/{}", endpoint.path()), &[("url", target)])
            .map_err(|e| FetchError::Network(format!("cannot build proxy url: {e}")))?;
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_encodes_target() {
        let route = ProxyRoute::parse("http://localhost:8080/api/proxy/").unwrap();
        let wrapped = route
            .wrap("https://status.example.com/api/v2/summary.json?x=1&y=2", ProxyEndpoint::Json)
            .unwrap();
        assert!(wrapped.starts_with("http://localhost:8080/api/proxy/json?url="));
        assert!(wrapped.contains("https%3A%2F%2Fstatus.example.com"));
        assert!(!wrapped.contains("&y=2"));
    }

    #[test]
    fn rss_endpoint_path() {
        let route = ProxyRoute::parse("http://localhost:8080/api/proxy").unwrap();
        let wrapped = route.wrap("https://feed.example.com/rss", ProxyEndpoint::Rss).unwrap();
        assert!(wrapped.starts_with("http://localhost:8080/api/proxy/rss?url="));
    }

    #[test]
    fn same_origin_detection() {
        let route = ProxyRoute::parse("http://localhost:8080/api/proxy").unwrap();
        assert!(!route.is_cross_origin("http://localhost:8080/other"));
        assert!(route.is_cross_origin("http://localhost:9090/other"));
        assert!(route.is_cross_origin("not a url"));
    }

    #[test]
    fn invalid_base_rejected() {
        assert!(ProxyRoute::parse("::nope::").is_err());
    }
}
