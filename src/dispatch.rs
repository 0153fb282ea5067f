//! Provider dispatch: routes a registry entry to the parser for its tag.
//!
//! # Resolution order
//!
//! 1. Tag on the external-only allowlist: external record, no request.
//! 2. Tag registered in the [`ProviderTable`]: that provider.
//! 3. No tag: generic Statuspage fetch when the URL looks like one,
//!    otherwise external-only.
//! 4. Unrecognized tag: generic Statuspage fetch when the URL looks like
//!    one, otherwise the error record.
//!
//! [`Dispatcher::dispatch`] never fails; every path ends in a
//! [`NormalizedStatus`].

use tracing::{debug, warn};

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::providers::{Provider, ProviderTable, is_atlassian_url};
use crate::registry::RegistryEntry;
use crate::status::NormalizedStatus;
use crate::status::fallback;

/// Tags whose vendors publish no usable machine-readable status.
pub const EXTERNAL_ONLY_TAGS: &[&str] = &[
    "google",
    "azure",
    "jenkins",
    "adobe",
    "sketch",
    "apple",
    "custom",
    "statuspal",
    "microsoft",
    "oracle",
    "ibm",
];

/// How one entry will be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    External,
    Provider(Provider),
    Unknown,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    fetcher: Fetcher,
    table: ProviderTable,
}

impl Dispatcher {
    pub fn new(fetcher: Fetcher) -> Self {
        Self::with_table(fetcher, ProviderTable::builtin())
    }

    pub fn with_table(fetcher: Fetcher, table: ProviderTable) -> Self {
        Self { fetcher, table }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Decide how `entry` is handled without doing any I/O.
    pub fn route(&self, entry: &RegistryEntry) -> Route {
        match entry.tag() {
            Some(tag) if EXTERNAL_ONLY_TAGS.contains(&tag.as_str()) => Route::External,
            Some(tag) => match self.table.get(&tag) {
                Some(provider) => Route::Provider(provider),
                None if is_atlassian_url(&entry.url) => Route::Provider(Provider::Atlassian),
                None => Route::Unknown,
            },
            None if is_atlassian_url(&entry.url) => Route::Provider(Provider::Atlassian),
            None => Route::External,
        }
    }

    /// `true` when dispatching `entry` will issue at least one request.
    pub fn makes_request(&self, entry: &RegistryEntry) -> bool {
        match self.route(entry) {
            Route::Provider(provider) => provider.makes_requests(),
            Route::External | Route::Unknown => false,
        }
    }

    pub async fn dispatch(&self, entry: &RegistryEntry) -> NormalizedStatus {
        match self.route(entry) {
            Route::External => {
                debug!(service = %entry.name, tag = ?entry.status_page_type, "external-only");
                fallback::external_status(entry)
            }
            Route::Provider(provider) => provider.parse(&self.fetcher, entry).await,
            Route::Unknown => {
                let err = FetchError::UnknownProvider(entry.status_page_type.clone().unwrap_or_default());
                warn!(service = %entry.name, kind = err.kind(), error = %err, "no parser for tag");
                fallback::error_status(entry)
            }
        }
    }
}
