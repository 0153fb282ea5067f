//! PayPal status events.
//!
//! Only production events count.  `Resolved` and `Completed` are over,
//! `Scheduled` maintenance has not started yet.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Indicator, NormalizedStatus, parse_timestamp};

#[derive(Debug, Deserialize)]
struct Payload {
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    title: String,
    status: EventStatus,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    environment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
enum EventStatus {
    Open,
    #[serde(alias = "In Progress", alias = "InProgress")]
    InProgress,
    Investigating,
    Monitoring,
    Scheduled,
    Resolved,
    Completed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Deserialize)]
enum Category {
    Incident,
    Maintenance,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Deserialize)]
enum Severity {
    Minor,
    Major,
    Critical,
    #[serde(other)]
    Other,
}

fn event_severity(event: &RawEvent) -> Indicator {
    let from_severity = match event.severity {
        Some(Severity::Minor) | Some(Severity::Other) | None => Indicator::Minor,
        Some(Severity::Major) => Indicator::Major,
        Some(Severity::Critical) => Indicator::Critical,
    };
    match event.category {
        Some(Category::Maintenance) => Indicator::Maintenance,
        Some(Category::Incident) | Some(Category::Other) | None => from_severity,
    }
}

fn is_active(event: &RawEvent) -> bool {
    !matches!(
        event.status,
        EventStatus::Resolved | EventStatus::Completed | EventStatus::Scheduled
    )
}

fn is_production(event: &RawEvent) -> bool {
    event
        .environment
        .as_deref()
        .is_none_or(|env| env.eq_ignore_ascii_case("production"))
}

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let opts = fetcher.options_for(&entry.url, timeout);
    let payload: Payload = fetcher.get_json(&entry.url, opts).await?;
    Ok(normalize(entry, payload))
}

fn normalize(entry: &RegistryEntry, payload: Payload) -> NormalizedStatus {
    let active: Vec<ActiveIssue> = payload
        .events
        .into_iter()
        .filter(|e| is_production(e) && is_active(e))
        .map(|e| {
            let severity = event_severity(&e);
            ActiveIssue::new(e.title, e.start_date.as_deref().and_then(parse_timestamp), severity)
        })
        .collect();
    NormalizedStatus::from_entry(entry, Utc::now(), Vec::new(), reduce::summarize(&active))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> RegistryEntry {
        RegistryEntry::new("PayPal", "https://www.paypal-status.com/api/production", "Payments", Some("paypal"))
    }

    fn decode(json: &str) -> Payload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn sandbox_and_resolved_events_ignored() {
        let s = normalize(
            &entry(),
            decode(
                r#"{"events":[
                    {"title":"Sandbox down","status":"Open","severity":"Critical","environment":"sandbox","startDate":"2024-04-01T10:00:00Z"},
                    {"title":"Login errors","status":"Resolved","severity":"Major","environment":"production","startDate":"2024-04-01T10:00:00Z"},
                    {"title":"Planned","status":"Scheduled","category":"Maintenance","startDate":"2024-04-09T10:00:00Z"}
                ]}"#,
            ),
        );
        assert_eq!(s.status.indicator, Indicator::None);
    }

    #[test]
    fn open_production_event() {
        let s = normalize(
            &entry(),
            decode(
                r#"{"events":[{"title":"Checkout errors","status":"In Progress","category":"Incident",
                    "severity":"Major","environment":"Production","startDate":"2024-04-01T10:00:00Z"}]}"#,
            ),
        );
        assert_eq!(s.status.indicator, Indicator::Major);
        assert_eq!(s.status.description, "Checkout errors");
    }

    #[test]
    fn running_maintenance() {
        let s = normalize(
            &entry(),
            decode(r#"{"events":[{"title":"DB work","status":"Open","category":"Maintenance"}]}"#),
        );
        assert_eq!(s.status.indicator, Indicator::Maintenance);
    }
}
