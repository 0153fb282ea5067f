//! Hotmart status events.
//!
//! A flat event list (bare array or wrapped in `events`).  An event is
//! active while `resolved_at` is null; its `type` decides severity.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, parse_timestamp, slug};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Bare(Vec<RawEvent>),
    Wrapped { events: Vec<RawEvent> },
}

impl Payload {
    fn into_events(self) -> Vec<RawEvent> {
        match self {
            Payload::Bare(events) | Payload::Wrapped { events } => events,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    title: String,
    #[serde(rename = "type")]
    kind: EventType,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    resolved_at: Option<String>,
    #[serde(default)]
    components: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EventType {
    Unavailability,
    Instability,
    Maintenance,
    Information,
    #[serde(other)]
    Unrecognized,
}

fn map_type(kind: EventType) -> Indicator {
    match kind {
        EventType::Unavailability => Indicator::Major,
        EventType::Instability => Indicator::Minor,
        EventType::Maintenance => Indicator::Maintenance,
        EventType::Information | EventType::Unrecognized => Indicator::None,
    }
}

fn component_for(kind: EventType) -> ComponentStatus {
    match kind {
        EventType::Unavailability => ComponentStatus::PartialOutage,
        EventType::Instability => ComponentStatus::DegradedPerformance,
        EventType::Maintenance => ComponentStatus::UnderMaintenance,
        EventType::Information | EventType::Unrecognized => ComponentStatus::Operational,
    }
}

fn is_resolved(resolved_at: Option<&str>) -> bool {
    resolved_at.is_some_and(|s| !s.trim().is_empty())
}

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let opts = fetcher.options_for(&entry.url, timeout);
    let payload: Payload = fetcher.get_json(&entry.url, opts).await?;
    Ok(normalize(entry, payload.into_events()))
}

fn normalize(entry: &RegistryEntry, events: Vec<RawEvent>) -> NormalizedStatus {
    let mut components: Vec<Component> = Vec::new();
    let mut active = Vec::new();
    for event in events.into_iter().filter(|e| !is_resolved(e.resolved_at.as_deref())) {
        for name in &event.components {
            if !components.iter().any(|c| c.name == *name) {
                components.push(Component::new(slug(name), name.clone(), component_for(event.kind)));
            }
        }
        let started = event.created_at.as_deref().and_then(parse_timestamp);
        active.push(ActiveIssue::new(event.title, started, map_type(event.kind)));
    }
    NormalizedStatus::from_entry(entry, Utc::now(), components, reduce::summarize(&active))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> RegistryEntry {
        RegistryEntry::new("Hotmart", "https://status.hotmart.com/api/events", "Payments", Some("hotmart"))
    }

    fn events(json: &str) -> Vec<RawEvent> {
        serde_json::from_str::<Payload>(json).unwrap().into_events()
    }

    #[test]
    fn only_unresolved_event_counts() {
        let s = normalize(
            &entry(),
            events(
                r#"[
                  {"id":1,"title":"Checkout unavailable","type":"unavailability","created_at":"2024-01-02T10:00:00Z","resolved_at":null},
                  {"id":2,"title":"Slow reports","type":"instability","created_at":"2024-01-03T10:00:00Z","resolved_at":"2024-01-01"}
                ]"#,
            ),
        );
        assert_eq!(s.status.indicator, Indicator::Major);
        assert_eq!(s.status.description, "Checkout unavailable");
    }

    #[test]
    fn wrapped_payload_and_components() {
        let s = normalize(
            &entry(),
            events(
                r#"{"events":[{"title":"Members area degraded","type":"instability",
                    "created_at":"2024-01-02T10:00:00Z","components":["Members Area"]}]}"#,
            ),
        );
        assert_eq!(s.status.indicator, Indicator::Minor);
        assert_eq!(s.components.len(), 1);
        assert_eq!(s.components[0].id, "members-area");
    }

    #[test]
    fn empty_list_is_operational() {
        let s = normalize(&entry(), events("[]"));
        assert_eq!(s.status.indicator, Indicator::None);
        assert_eq!(s.status.description, "All systems operational");
    }

    #[test]
    fn event_without_type_rejected() {
        assert!(serde_json::from_str::<Payload>(r#"[{"title":"x"}]"#).is_err());
    }
}
