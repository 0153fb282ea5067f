//! Stripe status history (Atom feed).
//!
//! Entries are updates, newest first.  An entry is over once its text
//! carries a resolution marker.

use std::time::Duration;

use feed_rs::model::Feed;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::NormalizedStatus;

use super::feed;

const RESOLVED_MARKERS: &[&str] = &["has been resolved", "resolved -", "resolved:", "completed", "is now operating normally"];

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let opts = fetcher.options_for(&entry.url, timeout);
    let feed = fetcher.get_feed(&entry.url, opts).await?;
    Ok(normalize(entry, &feed))
}

fn normalize(entry: &RegistryEntry, feed: &Feed) -> NormalizedStatus {
    feed::summarize_feed(entry, feed, RESOLVED_MARKERS)
}
