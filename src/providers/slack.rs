//! Slack status API (`/api/v2.0.0/current`).
//!
//! Slack has no component list; the services named by active incidents are
//! reported as affected components instead.

use std::time::Duration;

use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, StatusSummary, parse_timestamp, slug};

use super::endpoint;

#[derive(Debug, Deserialize)]
struct Current {
    status: NativeStatus,
    #[serde(default)]
    date_updated: Option<String>,
    #[serde(default)]
    active_incidents: Vec<RawIncident>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum NativeStatus {
    Ok,
    Active,
    Broken,
}

#[derive(Debug, Deserialize)]
struct RawIncident {
    title: String,
    #[serde(rename = "type")]
    kind: IncidentKind,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    date_created: Option<String>,
    #[serde(default)]
    services: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum IncidentKind {
    Outage,
    Incident,
    Notice,
    Maintenance,
    #[serde(other)]
    Other,
}

fn map_status(status: NativeStatus) -> Indicator {
    match status {
        NativeStatus::Ok => Indicator::None,
        NativeStatus::Active => Indicator::Minor,
        NativeStatus::Broken => Indicator::Major,
    }
}

fn map_kind(kind: IncidentKind) -> Indicator {
    match kind {
        IncidentKind::Outage => Indicator::Major,
        IncidentKind::Incident | IncidentKind::Notice | IncidentKind::Other => Indicator::Minor,
        IncidentKind::Maintenance => Indicator::Maintenance,
    }
}

fn component_for(kind: IncidentKind) -> ComponentStatus {
    match kind {
        IncidentKind::Outage => ComponentStatus::MajorOutage,
        IncidentKind::Maintenance => ComponentStatus::UnderMaintenance,
        IncidentKind::Incident | IncidentKind::Notice | IncidentKind::Other => ComponentStatus::DegradedPerformance,
    }
}

fn is_active(status: Option<&str>) -> bool {
    !matches!(status, Some("resolved" | "completed" | "scheduled"))
}

fn current_url(url: &str) -> String {
    if url.contains("/api/") {
        url.to_string()
    } else {
        endpoint(url, "api/v2.0.0/current")
    }
}

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let url = current_url(&entry.url);
    let opts = fetcher.options_for(&url, timeout);
    let current: Current = fetcher.get_json(&url, opts).await?;
    Ok(normalize(entry, current))
}

fn normalize(entry: &RegistryEntry, current: Current) -> NormalizedStatus {
    let mut components: Vec<Component> = Vec::new();
    let mut active = Vec::new();
    for incident in current.active_incidents.into_iter().filter(|i| is_active(i.status.as_deref())) {
        for service in &incident.services {
            let id = slug(service);
            let status = component_for(incident.kind);
            match components.iter_mut().find(|c| c.id == id) {
                Some(existing) if status.indicator().severity() > existing.status.indicator().severity() => {
                    existing.status = status;
                }
                Some(_) => {}
                None => components.push(Component::new(id, service.clone(), status)),
            }
        }
        let started = incident.date_created.as_deref().and_then(parse_timestamp);
        active.push(ActiveIssue::new(incident.title, started, map_kind(incident.kind)));
    }

    let aggregate = map_status(current.status);
    let status = if active.is_empty() {
        StatusSummary::new(aggregate, reduce::default_description(aggregate))
    } else {
        let latest = reduce::summarize(&active);
        StatusSummary::new(aggregate.worst(latest.indicator), latest.description)
    };

    let updated_at = current
        .date_updated
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(chrono::Utc::now);
    NormalizedStatus::from_entry(entry, updated_at, components, status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> RegistryEntry {
        RegistryEntry::new("Slack", "https://status.slack.com", "Chat", Some("slack"))
    }

    fn decode(json: &str) -> Current {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn ok_is_operational() {
        let s = normalize(&entry(), decode(r#"{"status":"ok","date_updated":"2024-04-01T10:00:00-07:00","active_incidents":[]}"#));
        assert_eq!(s.status.indicator, Indicator::None);
        assert!(s.components.is_empty());
    }

    #[test]
    fn outage_marks_services_and_severity() {
        let s = normalize(
            &entry(),
            decode(
                r#"{"status":"active","active_incidents":[
                    {"title":"Messages failing to send","type":"outage","status":"active",
                     "date_created":"2024-04-01T10:00:00-07:00","services":["Messaging","Connections"]},
                    {"title":"Huddles slow","type":"incident","status":"active",
                     "date_created":"2024-04-01T09:00:00-07:00","services":["Messaging","Huddles"]}
                ]}"#,
            ),
        );
        assert_eq!(s.status.indicator, Indicator::Major);
        assert_eq!(s.status.description, "Messages failing to send");
        assert_eq!(s.components.len(), 3);
        assert_eq!(s.components[0].status, ComponentStatus::MajorOutage);
        assert_eq!(s.components[2].status, ComponentStatus::DegradedPerformance);
    }

    #[test]
    fn default_path_is_current_api() {
        assert_eq!(current_url("https://status.slack.com"), "https://status.slack.com/api/v2.0.0/current");
    }
}
