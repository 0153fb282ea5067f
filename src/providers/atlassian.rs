//! Atlassian Statuspage (`/api/v2/summary.json` or `/api/v2/status.json`).
//!
//! This is also the default path for registry entries without a tag.  The
//! aggregate `status.indicator` already uses the shared vocabulary; the most
//! recent unresolved incident, when present, replaces the description.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, PageInfo, StatusSummary, parse_timestamp};

const SUMMARY_PATH: &str = "api/v2/summary.json";
const STATUS_PATH: &str = "api/v2/status.json";

/// `true` when `url` points at a Statuspage v2 JSON endpoint.
pub fn is_atlassian_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).trim_end_matches('/');
    path.ends_with(SUMMARY_PATH) || path.ends_with(STATUS_PATH)
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(default)]
    page: Option<Page>,
    #[serde(default)]
    components: Vec<RawComponent>,
    status: RawStatus,
    #[serde(default)]
    incidents: Vec<RawIncident>,
}

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
    name: String,
    url: String,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawComponent {
    id: String,
    name: String,
    status: NativeComponentStatus,
    #[serde(default)]
    group: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NativeComponentStatus {
    Operational,
    DegradedPerformance,
    PartialOutage,
    MajorOutage,
    UnderMaintenance,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    indicator: NativeIndicator,
    description: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum NativeIndicator {
    None,
    Minor,
    Major,
    Critical,
    Maintenance,
}

#[derive(Debug, Deserialize)]
struct RawIncident {
    name: String,
    status: IncidentState,
    #[serde(default)]
    started_at: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum IncidentState {
    Investigating,
    Identified,
    Monitoring,
    Resolved,
    Postmortem,
    #[serde(other)]
    Other,
}

// ── Mapping ───────────────────────────────────────────────────────────────────

fn map_indicator(native: NativeIndicator) -> Indicator {
    match native {
        NativeIndicator::None => Indicator::None,
        NativeIndicator::Minor => Indicator::Minor,
        NativeIndicator::Major => Indicator::Major,
        NativeIndicator::Critical => Indicator::Critical,
        NativeIndicator::Maintenance => Indicator::Maintenance,
    }
}

fn map_component(native: NativeComponentStatus) -> ComponentStatus {
    match native {
        NativeComponentStatus::Operational => ComponentStatus::Operational,
        NativeComponentStatus::DegradedPerformance => ComponentStatus::DegradedPerformance,
        NativeComponentStatus::PartialOutage => ComponentStatus::PartialOutage,
        NativeComponentStatus::MajorOutage => ComponentStatus::MajorOutage,
        NativeComponentStatus::UnderMaintenance => ComponentStatus::UnderMaintenance,
        NativeComponentStatus::Unrecognized => ComponentStatus::Unknown,
    }
}

fn is_active(state: IncidentState) -> bool {
    !matches!(state, IncidentState::Resolved | IncidentState::Postmortem)
}

// ── Parse ─────────────────────────────────────────────────────────────────────

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let opts = fetcher.options_for(&entry.url, timeout);
    let summary: Summary = fetcher.get_json_strict(&entry.url, opts).await?;
    Ok(normalize(entry, summary))
}

fn normalize(entry: &RegistryEntry, summary: Summary) -> NormalizedStatus {
    let components = summary
        .components
        .into_iter()
        .filter(|c| !c.group)
        .map(|c| Component::new(c.id, c.name, map_component(c.status)))
        .collect();

    let active: Vec<ActiveIssue> = summary
        .incidents
        .into_iter()
        .filter(|i| is_active(i.status))
        .map(|i| {
            let started = i
                .started_at
                .as_deref()
                .or(i.created_at.as_deref())
                .and_then(parse_timestamp);
            ActiveIssue::new(i.name, started, Indicator::None)
        })
        .collect();

    let indicator = map_indicator(summary.status.indicator);
    let description = if active.is_empty() {
        summary.status.description
    } else {
        reduce::summarize(&active).description
    };

    let page = match summary.page {
        Some(p) => PageInfo {
            id: p.id,
            name: p.name,
            url: p.url,
            updated_at: p
                .updated_at
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
        },
        None => PageInfo::for_entry(entry, Utc::now()),
    };

    NormalizedStatus::new(entry, page, components, StatusSummary::new(indicator, description))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> RegistryEntry {
        RegistryEntry::new("Acme", "https://status.acme.com/api/v2/summary.json", "Infra", None)
    }

    fn decode(json: &str) -> Summary {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn detects_statuspage_paths() {
        assert!(is_atlassian_url("https://status.acme.com/api/v2/summary.json"));
        assert!(is_atlassian_url("https://status.acme.com/api/v2/status.json?x=1"));
        assert!(!is_atlassian_url("https://status.acme.com/"));
        assert!(!is_atlassian_url("https://status.acme.com/api/v2/incidents.json"));
    }

    #[test]
    fn operational_summary_without_page() {
        let s = normalize(
            &entry(),
            decode(r#"{"status":{"indicator":"none","description":"All Systems Operational"},"components":[]}"#),
        );
        assert_eq!(s.status.indicator, Indicator::None);
        assert_eq!(s.status.description, "All Systems Operational");
        assert!(s.components.is_empty());
        assert_eq!(s.name, "Acme");
    }

    #[test]
    fn groups_are_skipped_and_statuses_mapped() {
        let s = normalize(
            &entry(),
            decode(
                r#"{
                "page":{"id":"p1","name":"Acme Status","url":"https://status.acme.com","updated_at":"2024-04-01T10:00:00.000Z"},
                "status":{"indicator":"minor","description":"Minor Service Outage"},
                "components":[
                    {"id":"g","name":"Group","status":"operational","group":true},
                    {"id":"a","name":"API","status":"degraded_performance"},
                    {"id":"b","name":"Web","status":"something_new"}
                ]}"#,
            ),
        );
        assert_eq!(s.page.id, "p1");
        assert_eq!(s.components.len(), 2);
        assert_eq!(s.components[0].status, ComponentStatus::DegradedPerformance);
        assert_eq!(s.components[1].status, ComponentStatus::Unknown);
        assert_eq!(s.status.indicator, Indicator::Minor);
    }

    #[test]
    fn active_incident_overrides_description_only() {
        let s = normalize(
            &entry(),
            decode(
                r#"{
                "status":{"indicator":"major","description":"Partial System Outage"},
                "incidents":[
                    {"name":"Old resolved","status":"resolved","started_at":"2024-04-01T12:00:00Z"},
                    {"name":"Webhooks delayed","status":"identified","started_at":"2024-04-01T09:00:00Z"}
                ]}"#,
            ),
        );
        assert_eq!(s.status.indicator, Indicator::Major);
        assert_eq!(s.status.description, "Webhooks delayed");
    }

    #[test]
    fn unknown_indicator_is_schema_error() {
        let r: Result<Summary, _> =
            serde_json::from_str(r#"{"status":{"indicator":"purple","description":"?"}}"#);
        assert!(r.is_err());
    }

    #[test]
    fn missing_status_is_schema_error() {
        let r: Result<Summary, _> = serde_json::from_str(r#"{"components":[]}"#);
        assert!(r.is_err());
    }
}
