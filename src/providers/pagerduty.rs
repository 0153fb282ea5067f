//! PagerDuty hosted status pages (`/api/status`).

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, StatusSummary, parse_timestamp};

use super::endpoint;

#[derive(Debug, Deserialize)]
struct Payload {
    summary: Summary,
    #[serde(default)]
    services: Vec<RawService>,
    #[serde(default)]
    incidents: Vec<RawIncident>,
}

#[derive(Debug, Deserialize)]
struct Summary {
    status: NativeStatus,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NativeStatus {
    Operational,
    Degraded,
    PartialOutage,
    MajorOutage,
    Maintenance,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Deserialize)]
struct RawService {
    id: String,
    name: String,
    status: NativeStatus,
}

#[derive(Debug, Deserialize)]
struct RawIncident {
    title: String,
    status: IncidentState,
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    started_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum IncidentState {
    Investigating,
    Identified,
    Monitoring,
    Resolved,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Severity {
    Minor,
    Major,
    Critical,
    #[serde(other)]
    Unrecognized,
}

fn map_summary(status: NativeStatus) -> Result<Indicator, FetchError> {
    match status {
        NativeStatus::Operational => Ok(Indicator::None),
        NativeStatus::Degraded => Ok(Indicator::Minor),
        NativeStatus::PartialOutage => Ok(Indicator::Major),
        NativeStatus::MajorOutage => Ok(Indicator::Critical),
        NativeStatus::Maintenance => Ok(Indicator::Maintenance),
        NativeStatus::Unrecognized => Err(FetchError::Schema("unrecognized pagerduty summary status".into())),
    }
}

fn map_service(status: NativeStatus) -> ComponentStatus {
    match status {
        NativeStatus::Operational => ComponentStatus::Operational,
        NativeStatus::Degraded => ComponentStatus::DegradedPerformance,
        NativeStatus::PartialOutage => ComponentStatus::PartialOutage,
        NativeStatus::MajorOutage => ComponentStatus::MajorOutage,
        NativeStatus::Maintenance => ComponentStatus::UnderMaintenance,
        NativeStatus::Unrecognized => ComponentStatus::Unknown,
    }
}

fn map_severity(severity: Option<Severity>) -> Indicator {
    match severity {
        Some(Severity::Minor) | Some(Severity::Unrecognized) | None => Indicator::Minor,
        Some(Severity::Major) => Indicator::Major,
        Some(Severity::Critical) => Indicator::Critical,
    }
}

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let url = endpoint(&entry.url, "api/status");
    let opts = fetcher.options_for(&url, timeout);
    let payload: Payload = fetcher.get_json(&url, opts).await?;
    normalize(entry, payload)
}

fn normalize(entry: &RegistryEntry, payload: Payload) -> Result<NormalizedStatus, FetchError> {
    let aggregate = map_summary(payload.summary.status)?;

    let components = payload
        .services
        .into_iter()
        .map(|s| Component::new(s.id, s.name, map_service(s.status)))
        .collect();

    let active: Vec<ActiveIssue> = payload
        .incidents
        .into_iter()
        .filter(|i| i.status != IncidentState::Resolved)
        .map(|i| {
            let started = i.started_at.as_deref().and_then(parse_timestamp);
            ActiveIssue::new(i.title, started, map_severity(i.severity))
        })
        .collect();

    let status = if active.is_empty() {
        StatusSummary::new(aggregate, reduce::default_description(aggregate))
    } else {
        let latest = reduce::summarize(&active);
        StatusSummary::new(aggregate.worst(latest.indicator), latest.description)
    };

    let updated_at = payload
        .summary
        .updated_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now);
    Ok(NormalizedStatus::from_entry(entry, updated_at, components, status))
}
