//! AWS Health Dashboard RSS feed.
//!
//! Item titles start with a fixed label (`Service disruption: ...`,
//! `Informational message: ...`).  The label is the severity; items closed
//! with "Service is operating normally" or tagged `[RESOLVED]` are over.

use std::time::Duration;

use feed_rs::model::{Entry, Feed};

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Indicator, NormalizedStatus};

use super::feed;

const RESOLVED_MARKERS: &[&str] = &["service is operating normally", "[resolved]"];

/// Title labels used by the AWS feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    ServiceDisruption,
    PerformanceIssues,
    IncreasedErrorRates,
    IncreasedLatencies,
    Informational,
    Unlabelled,
}

impl Label {
    fn from_title(title: &str) -> Self {
        let lower = title.trim().to_lowercase();
        if lower.starts_with("service disruption") {
            Label::ServiceDisruption
        } else if lower.starts_with("performance issues") {
            Label::PerformanceIssues
        } else if lower.starts_with("increased error rates") {
            Label::IncreasedErrorRates
        } else if lower.starts_with("increased latencies") || lower.starts_with("increased api latencies") {
            Label::IncreasedLatencies
        } else if lower.starts_with("informational message") {
            Label::Informational
        } else {
            Label::Unlabelled
        }
    }
}

fn map_label(label: Label, text: &str) -> Indicator {
    match label {
        Label::ServiceDisruption => Indicator::Major,
        Label::PerformanceIssues | Label::IncreasedErrorRates | Label::IncreasedLatencies => Indicator::Minor,
        Label::Informational => Indicator::Minor,
        Label::Unlabelled => reduce::keyword_severity(text, Indicator::Minor),
    }
}

fn active_issue(item: &Entry) -> Option<ActiveIssue> {
    let text = feed::searchable_text(item);
    if feed::contains_any(&text, RESOLVED_MARKERS) {
        return None;
    }
    let title = feed::title(item);
    let severity = map_label(Label::from_title(&title), &text);
    Some(ActiveIssue::new(title, feed::started_at(item), severity))
}

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
    let active: Vec<ActiveIssue> = feed.entries.iter().filter_map(active_issue).collect();
    NormalizedStatus::from_entry(
        entry,
        feed::feed_updated(feed).unwrap_or_else(chrono::Utc::now),
        Vec::new(),
        reduce::summarize(&active),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> RegistryEntry {
        RegistryEntry::new("AWS", "https://status.aws.amazon.com/rss/all.rss", "Cloud", Some("aws"))
    }

    fn rss(items: &str) -> Feed {
        let xml = format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>AWS</title>{items}</channel></rss>"#
        );
        feed_rs::parser::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn labels_parse_from_titles() {
        assert_eq!(Label::from_title("Service disruption: Amazon S3 (us-east-1)"), Label::ServiceDisruption);
        assert_eq!(Label::from_title("Increased Error Rates : Lambda"), Label::IncreasedErrorRates);
        assert_eq!(Label::from_title("Something else"), Label::Unlabelled);
    }

    #[test]
    fn resolved_items_ignored() {
        let feed = rss(
            r#"<item><title>Service is operating normally: [RESOLVED] Increased Error Rates</title>
               <description>The issue has been resolved.</description>
               <pubDate>Tue, 02 Apr 2024 10:00:00 GMT</pubDate><guid>1</guid></item>"#,
        );
        assert_eq!(normalize(&entry(), &feed).status.indicator, Indicator::None);
    }

    #[test]
    fn disruption_is_major() {
        let feed = rss(
            r#"<item><title>Service disruption: Amazon EC2 (us-east-1)</title>
               <description>We are investigating instance launch failures.</description>
               <pubDate>Tue, 02 Apr 2024 10:00:00 GMT</pubDate><guid>1</guid></item>
               <item><title>Informational message: Amazon RDS (eu-west-1)</title>
               <description>Some customers may see delays.</description>
               <pubDate>Mon, 01 Apr 2024 10:00:00 GMT</pubDate><guid>2</guid></item>"#,
        );
        let s = normalize(&entry(), &feed);
        assert_eq!(s.status.indicator, Indicator::Major);
        assert_eq!(s.status.description, "Service disruption: Amazon EC2 (us-east-1)");
    }
}
