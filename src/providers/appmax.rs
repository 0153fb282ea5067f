//! AppMax incident list.

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
    data: Vec<RawIncident>,
}

#[derive(Debug, Deserialize)]
struct RawIncident {
    name: String,
    status: IncidentState,
    #[serde(default)]
    impact: Option<Impact>,
    #[serde(default)]
    started_at: Option<String>,
    #[serde(default)]
    resolved_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum IncidentState {
    Investigating,
    Identified,
    Monitoring,
    InProgress,
    Scheduled,
    Resolved,
    Completed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Impact {
    None,
    Minor,
    Major,
    Critical,
    Maintenance,
    #[serde(other)]
    Unrecognized,
}

fn map_impact(impact: Option<Impact>) -> Indicator {
    match impact {
        Some(Impact::None) => Indicator::None,
        Some(Impact::Minor) | Some(Impact::Unrecognized) | None => Indicator::Minor,
        Some(Impact::Major) => Indicator::Major,
        Some(Impact::Critical) => Indicator::Critical,
        Some(Impact::Maintenance) => Indicator::Maintenance,
    }
}

fn is_active(incident: &RawIncident) -> bool {
    incident.resolved_at.is_none()
        && !matches!(
            incident.status,
            IncidentState::Resolved | IncidentState::Completed | IncidentState::Scheduled
        )
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
        .data
        .into_iter()
        .filter(is_active)
        .map(|i| {
            let severity = map_impact(i.impact).worst(reduce::keyword_severity(&i.name, Indicator::None));
            ActiveIssue::new(i.name, i.started_at.as_deref().and_then(parse_timestamp), severity)
        })
        .collect();
    NormalizedStatus::from_entry(entry, Utc::now(), Vec::new(), reduce::summarize(&active))
}
