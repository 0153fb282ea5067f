//! Status.io public status API (`api.status.io/1.0/status/{page_id}`).
//!
//! Everything is keyed by numeric status codes; `status_overall` carries the
//! aggregate and each entry of `status` is one component.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, StatusSummary, parse_timestamp};

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope {
    result: StatusResult,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    status_overall: Overall,
    #[serde(default)]
    status: Vec<RawComponent>,
    #[serde(default)]
    incidents: Vec<RawEvent>,
    #[serde(default)]
    maintenance: Maintenance,
}

#[derive(Debug, Deserialize)]
struct Overall {
    #[serde(default)]
    updated: Option<String>,
    status_code: u16,
}

#[derive(Debug, Deserialize)]
struct RawComponent {
    id: String,
    name: String,
    status_code: u16,
}

#[derive(Debug, Default, Deserialize)]
struct Maintenance {
    #[serde(default)]
    active: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    name: String,
    #[serde(default)]
    datetime_open: Option<String>,
    #[serde(default)]
    datetime_planned_start: Option<String>,
}

/// Status.io status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Code {
    Operational,
    PlannedMaintenance,
    DegradedPerformance,
    PartialDisruption,
    ServiceDisruption,
    SecurityEvent,
}

impl Code {
    fn from_u16(code: u16) -> Option<Self> {
        match code {
            100 => Some(Code::Operational),
            200 => Some(Code::PlannedMaintenance),
            300 => Some(Code::DegradedPerformance),
            400 => Some(Code::PartialDisruption),
            500 => Some(Code::ServiceDisruption),
            600 => Some(Code::SecurityEvent),
            _ => None,
        }
    }
}

// ── Mapping ───────────────────────────────────────────────────────────────────

fn map_indicator(code: Code) -> Indicator {
    match code {
        Code::Operational => Indicator::None,
        Code::PlannedMaintenance => Indicator::Maintenance,
        Code::DegradedPerformance => Indicator::Minor,
        Code::PartialDisruption => Indicator::Major,
        Code::ServiceDisruption | Code::SecurityEvent => Indicator::Critical,
    }
}

fn map_component(code: Option<Code>) -> ComponentStatus {
    match code {
        Some(Code::Operational) => ComponentStatus::Operational,
        Some(Code::PlannedMaintenance) => ComponentStatus::UnderMaintenance,
        Some(Code::DegradedPerformance) => ComponentStatus::DegradedPerformance,
        Some(Code::PartialDisruption) => ComponentStatus::PartialOutage,
        Some(Code::ServiceDisruption | Code::SecurityEvent) => ComponentStatus::MajorOutage,
        None => ComponentStatus::Unknown,
    }
}

// ── Parse ─────────────────────────────────────────────────────────────────────

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let opts = fetcher.options_for(&entry.url, timeout);
    let envelope: Envelope = fetcher.get_json(&entry.url, opts).await?;
    normalize(entry, envelope.result)
}

fn normalize(entry: &RegistryEntry, result: StatusResult) -> Result<NormalizedStatus, FetchError> {
    let overall = Code::from_u16(result.status_overall.status_code).ok_or_else(|| {
        FetchError::Schema(format!("unknown status.io code {}", result.status_overall.status_code))
    })?;
    let indicator = map_indicator(overall);

    let components = result
        .status
        .into_iter()
        .map(|c| Component::new(c.id, c.name, map_component(Code::from_u16(c.status_code))))
        .collect();

    let mut active: Vec<ActiveIssue> = result
        .incidents
        .into_iter()
        .map(|i| ActiveIssue::new(i.name, i.datetime_open.as_deref().and_then(parse_timestamp), indicator))
        .collect();
    active.extend(result.maintenance.active.into_iter().map(|m| {
        let started = m.datetime_planned_start.as_deref().and_then(parse_timestamp);
        ActiveIssue::new(m.name, started, Indicator::Maintenance)
    }));

    let description = if active.is_empty() {
        reduce::default_description(indicator).to_string()
    } else {
        reduce::summarize(&active).description
    };

    let updated_at = result
        .status_overall
        .updated
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now);
    Ok(NormalizedStatus::from_entry(
        entry,
        updated_at,
        components,
        StatusSummary::new(indicator, description),
    ))
}
