//! Cachet (`/api/v1/components` + `/api/v1/incidents`).
//!
//! Cachet encodes every state as a small integer.  Components carry the
//! aggregate; open incidents (anything not yet `fixed`) supply the text.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, StatusSummary, parse_timestamp, worst_component};

use super::endpoint;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawComponent {
    id: u64,
    name: String,
    status: u8,
    #[serde(default = "enabled_default")]
    enabled: bool,
}

fn enabled_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawIncident {
    name: String,
    status: u8,
    #[serde(default)]
    occurred_at: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComponentCode {
    Operational,
    PerformanceIssues,
    PartialOutage,
    MajorOutage,
}

impl ComponentCode {
    fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(ComponentCode::Operational),
            2 => Some(ComponentCode::PerformanceIssues),
            3 => Some(ComponentCode::PartialOutage),
            4 => Some(ComponentCode::MajorOutage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IncidentCode {
    Scheduled,
    Investigating,
    Identified,
    Watching,
    Fixed,
}

impl IncidentCode {
    fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(IncidentCode::Scheduled),
            1 => Some(IncidentCode::Investigating),
            2 => Some(IncidentCode::Identified),
            3 => Some(IncidentCode::Watching),
            4 => Some(IncidentCode::Fixed),
            _ => None,
        }
    }
}

fn map_component(code: Option<ComponentCode>) -> ComponentStatus {
    match code {
        Some(ComponentCode::Operational) => ComponentStatus::Operational,
        Some(ComponentCode::PerformanceIssues) => ComponentStatus::DegradedPerformance,
        Some(ComponentCode::PartialOutage) => ComponentStatus::PartialOutage,
        Some(ComponentCode::MajorOutage) => ComponentStatus::MajorOutage,
        None => ComponentStatus::Unknown,
    }
}

fn is_active(code: Option<IncidentCode>) -> bool {
    matches!(
        code,
        Some(IncidentCode::Investigating | IncidentCode::Identified | IncidentCode::Watching)
    )
}

fn api_base(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    match trimmed.find("/api/v1") {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    }
}

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let base = api_base(&entry.url);
    let components_url = endpoint(base, "api/v1/components");
    let incidents_url = endpoint(base, "api/v1/incidents");

    let (components, incidents) = tokio::try_join!(
        fetcher.get_json::<Envelope<RawComponent>>(&components_url, fetcher.options_for(&components_url, timeout)),
        fetcher.get_json::<Envelope<RawIncident>>(&incidents_url, fetcher.options_for(&incidents_url, timeout)),
    )?;
    Ok(normalize(entry, components.data, incidents.data))
}

fn normalize(entry: &RegistryEntry, components: Vec<RawComponent>, incidents: Vec<RawIncident>) -> NormalizedStatus {
    let components: Vec<Component> = components
        .into_iter()
        .filter(|c| c.enabled)
        .map(|c| Component::new(c.id.to_string(), c.name, map_component(ComponentCode::from_u8(c.status))))
        .collect();
    let aggregate = worst_component(&components);

    let active: Vec<ActiveIssue> = incidents
        .into_iter()
        .filter(|i| is_active(IncidentCode::from_u8(i.status)))
        .map(|i| {
            let started = i
                .occurred_at
                .as_deref()
                .or(i.created_at.as_deref())
                .and_then(parse_timestamp);
            let severity = reduce::keyword_severity(&i.name, Indicator::Minor);
            ActiveIssue::new(i.name, started, severity)
        })
        .collect();

    let status = if active.is_empty() {
        StatusSummary::new(aggregate, reduce::default_description(aggregate))
    } else {
        let latest = reduce::summarize(&active);
        StatusSummary::new(aggregate.worst(latest.indicator), latest.description)
    };
    NormalizedStatus::from_entry(entry, Utc::now(), components, status)
}
