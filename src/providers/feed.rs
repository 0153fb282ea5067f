//! Helpers shared by the RSS/Atom providers.

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed};

use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Indicator, NormalizedStatus};

/// Standard reduction for incident feeds: entries matching any of
/// `resolved_markers` are dropped, the rest are keyword-ranked (default
/// `minor`) and the newest one wins.
pub(super) fn summarize_feed(entry: &RegistryEntry, feed: &Feed, resolved_markers: &[&str]) -> NormalizedStatus {
    let active: Vec<ActiveIssue> = feed
        .entries
        .iter()
        .filter_map(|item| {
            let text = searchable_text(item);
            if contains_any(&text, resolved_markers) {
                return None;
            }
            Some(ActiveIssue::new(
                title(item),
                started_at(item),
                reduce::keyword_severity(&text, Indicator::Minor),
            ))
        })
        .collect();

    NormalizedStatus::from_entry(
        entry,
        feed_updated(feed).unwrap_or_else(Utc::now),
        Vec::new(),
        reduce::summarize(&active),
    )
}

/// Entry title.
pub(super) fn title(entry: &Entry) -> String {
    entry
        .title
        .as_ref()
        .map(|t| strip_tags(&t.content))
        .unwrap_or_default()
}

/// Title, summary and content joined and lowercased, tags stripped.
pub(super) fn searchable_text(entry: &Entry) -> String {
    let mut text = title(entry);
    if let Some(summary) = &entry.summary {
        text.push('\n');
        text.push_str(&strip_tags(&summary.content));
    }
    if let Some(body) = entry.content.as_ref().and_then(|c| c.body.as_deref()) {
        text.push('\n');
        text.push_str(&strip_tags(body));
    }
    text.to_lowercase()
}

/// When the entry was first published, falling back to its update time.
pub(super) fn started_at(entry: &Entry) -> Option<DateTime<Utc>> {
    entry.published.or(entry.updated)
}

/// Feed update time, else the newest entry time.
pub(super) fn feed_updated(feed: &Feed) -> Option<DateTime<Utc>> {
    feed.updated
        .or_else(|| feed.entries.iter().filter_map(|e| e.updated.or(e.published)).max())
}

/// `true` when `text` (already lowercased) contains any marker.
pub(super) fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

/// Drop anything between `<` and `>` and collapse whitespace.
pub(super) fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
