//! incident.io status pages, read through their RSS feed.
//!
//! The feed carries one item per incident with the latest update as body.
//! Items whose text says the incident (or maintenance) is over are ignored;
//! the newest remaining item drives the summary.

use std::time::Duration;

use feed_rs::model::Feed;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::NormalizedStatus;

use super::{endpoint, feed};

const RESOLVED_MARKERS: &[&str] = &[
    "this incident has been resolved",
    "incident has been resolved",
    "maintenance has been completed",
    "maintenance is complete",
];

fn feed_url(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    if lower.ends_with(".rss") || lower.ends_with(".xml") || lower.contains("/feed") {
        url.to_string()
    } else {
        endpoint(url, "feed.rss")
    }
}

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let url = feed_url(&entry.url);
    let opts = fetcher.options_for(&url, timeout);
    let feed = fetcher.get_feed(&url, opts).await?;
    Ok(normalize(entry, &feed))
}

fn normalize(entry: &RegistryEntry, feed: &Feed) -> NormalizedStatus {
    feed::summarize_feed(entry, feed, RESOLVED_MARKERS)
}
