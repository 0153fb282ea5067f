//! Upstream HTTP access shared by every provider.
//!
//! One [`Fetcher`] wraps a single `reqwest::Client` (an `Arc` internally, so
//! clones are cheap).  Every call takes explicit [`FetchOptions`]: the
//! timeout the provider wants and whether to route through the same-origin
//! proxy.  Nothing here inspects ambient state to make that decision.

mod proxy;

pub use proxy::{ProxyEndpoint, ProxyRoute};

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::config::FetchConfig;
use crate::error::{AppError, FetchError};

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_FEED: &str = "application/rss+xml, application/atom+xml, text/xml;q=0.9, */*;q=0.5";

/// Per-call fetch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// Route through the configured proxy instead of hitting upstream directly.
    pub via_proxy: bool,
}

impl FetchOptions {
    pub fn direct(timeout: Duration) -> Self {
        Self { timeout, via_proxy: false }
    }
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout_cap: Option<Duration>,
    proxy: Option<ProxyRoute>,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        let proxy = if config.proxy.enabled {
            Some(ProxyRoute::parse(&config.proxy.base_url)?)
        } else {
            None
        };

        Ok(Self { client, timeout_cap: config.timeout_cap, proxy })
    }

    /// Resolve options for one call: apply the timeout cap and decide proxying
    /// from the target's origin.
    pub fn options_for(&self, url: &str, timeout: Duration) -> FetchOptions {
        let timeout = match self.timeout_cap {
            Some(cap) => timeout.min(cap),
            None => timeout,
        };
        let via_proxy = self
            .proxy
            .as_ref()
            .is_some_and(|p| p.is_cross_origin(url));
        FetchOptions { timeout, via_proxy }
    }

    /// GET `url` and decode the body as JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        opts: FetchOptions,
    ) -> Result<T, FetchError> {
        let response = self.send(url, ACCEPT_JSON, ProxyEndpoint::Json, opts).await?;
        decode_json(response, opts.timeout).await
    }

    /// Like [`get_json`](Self::get_json) but rejects non-JSON content types.
    pub async fn get_json_strict<T: DeserializeOwned>(
        &self,
        url: &str,
        opts: FetchOptions,
    ) -> Result<T, FetchError> {
        let response = self.send(url, ACCEPT_JSON, ProxyEndpoint::Json, opts).await?;
        let content_type = content_type(&response);
        if !content_type.contains("json") {
            return Err(FetchError::ContentType(content_type));
        }
        decode_json(response, opts.timeout).await
    }

    /// GET an RSS or Atom feed.
    pub async fn get_feed(&self, url: &str, opts: FetchOptions) -> Result<feed_rs::model::Feed, FetchError> {
        let response = self.send(url, ACCEPT_FEED, ProxyEndpoint::Rss, opts).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(e, opts.timeout))?;
        feed_rs::parser::parse(&bytes[..]).map_err(|e| FetchError::Schema(format!("feed: {e}")))
    }

    /// Issue a GET without status checking.  Used by the proxy handlers,
    /// which forward upstream statuses as-is.
    pub async fn get_raw(&self, url: &str, accept: &str, timeout: Duration) -> Result<Response, FetchError> {
        let timeout = self.options_for(url, timeout).timeout;
        self.client
            .get(url)
            .header(ACCEPT, accept)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))
    }

    async fn send(
        &self,
        url: &str,
        accept: &str,
        endpoint: ProxyEndpoint,
        opts: FetchOptions,
    ) -> Result<Response, FetchError> {
        let target = match (&self.proxy, opts.via_proxy) {
            (Some(proxy), true) => proxy.wrap(url, endpoint)?,
            _ => url.to_string(),
        };

        debug!(
            url = %url,
            via_proxy = opts.via_proxy,
            timeout_ms = opts.timeout.as_millis() as u64,
            "fetching upstream"
        );

        let response = self
            .client
            .get(&target)
            .header(ACCEPT, accept)
            .timeout(opts.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, opts.timeout))?;

        let status = response.status();
        trace!(url = %url, %status, "upstream responded");
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

fn content_type(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase()
}

async fn decode_json<T: DeserializeOwned>(response: Response, timeout: Duration) -> Result<T, FetchError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::from_reqwest(e, timeout))?;
    serde_json::from_slice(&bytes).map_err(|e| FetchError::Schema(e.to_string()))
}
