//! Status-page provider parsers.
//!
//! `Provider` is an enum over every supported vendor.  Each variant has its
//! own module with private wire types, a native status vocabulary, and a
//! total mapping into the shared [`Indicator`](crate::status::Indicator).
//! Adding a vendor = new module + new variant + a [`ProviderSpec`] arm and a
//! `fetch` arm below.
//!
//! [`Provider::parse`] is the public entry point and never fails: any
//! [`FetchError`] is logged and converted into the provider's fallback
//! record.

mod appmax;
mod atlassian;
mod aws;
mod betterstack;
mod cachet;
mod feed;
mod google_cloud;
mod heroku;
mod hotmart;
mod incidentio;
mod instatus;
mod openstatus;
mod pagerduty;
mod paypal;
mod playstation;
mod salesforce;
mod slack;
mod statusio;
mod stripe;
mod uptimerobot;
mod xbox;

pub use atlassian::is_atlassian_url;

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::NormalizedStatus;
use crate::status::fallback;

/// What a provider yields when its upstream cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// `indicator = error`; the default for every real API.
    Error,
    /// `indicator = none`; failures are masked as healthy.
    Operational,
}

/// Static facts about one provider.  Unset fields take the common values:
/// 8s timeout, error fallback, network access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSpec {
    pub tags: &'static [&'static str],
    pub timeout: Duration,
    pub fallback: FallbackPolicy,
    pub makes_requests: bool,
}

impl ProviderSpec {
    const fn new(tags: &'static [&'static str]) -> Self {
        Self {
            tags,
            timeout: Duration::from_secs(8),
            fallback: FallbackPolicy::Error,
            makes_requests: true,
        }
    }
}

/// All supported status-page vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Atlassian,
    IncidentIo,
    BetterStack,
    Instatus,
    OpenStatus,
    StatusIo,
    PagerDuty,
    Slack,
    Heroku,
    Cachet,
    UptimeRobot,
    Hotmart,
    AppMax,
    PayPal,
    Xbox,
    Salesforce,
    Stripe,
    Aws,
    PlayStation,
    GoogleCloud,
}

impl Provider {
    pub const ALL: [Provider; 20] = [
        Provider::Atlassian,
        Provider::IncidentIo,
        Provider::BetterStack,
        Provider::Instatus,
        Provider::OpenStatus,
        Provider::StatusIo,
        Provider::PagerDuty,
        Provider::Slack,
        Provider::Heroku,
        Provider::Cachet,
        Provider::UptimeRobot,
        Provider::Hotmart,
        Provider::AppMax,
        Provider::PayPal,
        Provider::Xbox,
        Provider::Salesforce,
        Provider::Stripe,
        Provider::Aws,
        Provider::PlayStation,
        Provider::GoogleCloud,
    ];

    /// Routing facts for this provider, in one place.
    pub const fn spec(self) -> ProviderSpec {
        const SLOW: Duration = Duration::from_secs(10);
        const FAST: Duration = Duration::from_secs(5);
        match self {
            Provider::Atlassian => ProviderSpec { timeout: SLOW, ..ProviderSpec::new(&["atlassian", "statuspage"]) },
            Provider::IncidentIo => ProviderSpec::new(&["incidentio", "incident.io"]),
            Provider::BetterStack => ProviderSpec::new(&["betterstack", "betteruptime"]),
            Provider::Instatus => ProviderSpec::new(&["instatus"]),
            Provider::OpenStatus => ProviderSpec { timeout: FAST, ..ProviderSpec::new(&["openstatus"]) },
            Provider::StatusIo => ProviderSpec::new(&["statusio", "status.io"]),
            Provider::PagerDuty => ProviderSpec::new(&["pagerduty"]),
            Provider::Slack => ProviderSpec::new(&["slack"]),
            Provider::Heroku => ProviderSpec::new(&["heroku"]),
            Provider::Cachet => ProviderSpec::new(&["cachet"]),
            Provider::UptimeRobot => ProviderSpec::new(&["uptimerobot"]),
            Provider::Hotmart => ProviderSpec::new(&["hotmart"]),
            Provider::AppMax => ProviderSpec::new(&["appmax"]),
            Provider::PayPal => ProviderSpec::new(&["paypal"]),
            Provider::Xbox => ProviderSpec::new(&["xbox"]),
            Provider::Salesforce => ProviderSpec { timeout: SLOW, ..ProviderSpec::new(&["salesforce"]) },
            Provider::Stripe => ProviderSpec::new(&["stripe"]),
            Provider::Aws => ProviderSpec::new(&["aws"]),
            Provider::PlayStation => ProviderSpec { makes_requests: false, ..ProviderSpec::new(&["playstation", "psn"]) },
            Provider::GoogleCloud => ProviderSpec {
                timeout: FAST,
                fallback: FallbackPolicy::Operational,
                ..ProviderSpec::new(&["google-cloud", "gcp"])
            },
        }
    }

    /// Registry `statusPageType` values routed to this provider.
    pub fn tags(self) -> &'static [&'static str] {
        self.spec().tags
    }

    /// Canonical tag, used as a log field.
    pub fn name(self) -> &'static str {
        self.tags()[0]
    }

    /// Built-in request timeout (before the configured cap).
    pub fn timeout(self) -> Duration {
        self.spec().timeout
    }

    pub fn fallback(self) -> FallbackPolicy {
        self.spec().fallback
    }

    /// `false` for providers that answer without touching the network.
    pub fn makes_requests(self) -> bool {
        self.spec().makes_requests
    }

    /// Fetch and normalize `entry`.  Never fails; see [`FallbackPolicy`].
    pub async fn parse(self, fetcher: &Fetcher, entry: &RegistryEntry) -> NormalizedStatus {
        match self.fetch(fetcher, entry).await {
            Ok(status) => {
                debug!(
                    service = %entry.name,
                    provider = self.name(),
                    indicator = %status.status.indicator,
                    "provider parsed"
                );
                status
            }
            Err(e) => {
                warn!(
                    service = %entry.name,
                    provider = self.name(),
                    kind = e.kind(),
                    error = %e,
                    "provider failed, using fallback"
                );
                match self.fallback() {
                    FallbackPolicy::Error => fallback::error_status(entry),
                    FallbackPolicy::Operational => fallback::operational_status(entry),
                }
            }
        }
    }

    async fn fetch(self, fetcher: &Fetcher, entry: &RegistryEntry) -> Result<NormalizedStatus, FetchError> {
        let timeout = self.timeout();
        match self {
            Provider::Atlassian => atlassian::parse(fetcher, entry, timeout).await,
            Provider::IncidentIo => incidentio::parse(fetcher, entry, timeout).await,
            Provider::BetterStack => betterstack::parse(fetcher, entry, timeout).await,
            Provider::Instatus => instatus::parse(fetcher, entry, timeout).await,
            Provider::OpenStatus => openstatus::parse(fetcher, entry, timeout).await,
            Provider::StatusIo => statusio::parse(fetcher, entry, timeout).await,
            Provider::PagerDuty => pagerduty::parse(fetcher, entry, timeout).await,
            Provider::Slack => slack::parse(fetcher, entry, timeout).await,
            Provider::Heroku => heroku::parse(fetcher, entry, timeout).await,
            Provider::Cachet => cachet::parse(fetcher, entry, timeout).await,
            Provider::UptimeRobot => uptimerobot::parse(fetcher, entry, timeout).await,
            Provider::Hotmart => hotmart::parse(fetcher, entry, timeout).await,
            Provider::AppMax => appmax::parse(fetcher, entry, timeout).await,
            Provider::PayPal => paypal::parse(fetcher, entry, timeout).await,
            Provider::Xbox => xbox::parse(fetcher, entry, timeout).await,
            Provider::Salesforce => salesforce::parse(fetcher, entry, timeout).await,
            Provider::Stripe => stripe::parse(fetcher, entry, timeout).await,
            Provider::Aws => aws::parse(fetcher, entry, timeout).await,
            Provider::PlayStation => Ok(playstation::parse(entry)),
            Provider::GoogleCloud => google_cloud::parse(fetcher, entry, timeout).await,
        }
    }
}

// ── Tag table ─────────────────────────────────────────────────────────────────

/// Lookup from registry tag to provider.
#[derive(Debug, Clone)]
pub struct ProviderTable {
    by_tag: HashMap<&'static str, Provider>,
}

impl ProviderTable {
    /// Table with every built-in provider registered under all its tags.
    pub fn builtin() -> Self {
        let mut table = Self { by_tag: HashMap::new() };
        for provider in Provider::ALL {
            table.register(provider);
        }
        table
    }

    pub fn register(&mut self, provider: Provider) {
        for tag in provider.tags() {
            self.by_tag.insert(tag, provider);
        }
    }

    /// `tag` must already be normalized (trimmed, lowercase).
    pub fn get(&self, tag: &str) -> Option<Provider> {
        self.by_tag.get(tag).copied()
    }
}

impl Default for ProviderTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Append `path` to a base URL unless `base` already points at it.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(path.trim_start_matches('/')) {
        trimmed.to_string()
    } else {
        format!("{trimmed}/{}", path.trim_start_matches('/'))
    }
}
