//! Better Stack (formerly Better Uptime) public `index.json`.
//!
//! JSON:API document: the aggregate lives on `data.attributes.aggregate_state`,
//! resources and status reports are mixed into `included`.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, PageInfo, StatusSummary, parse_timestamp};

use super::endpoint;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Document {
    data: Data,
    #[serde(default)]
    included: Vec<Included>,
}

#[derive(Debug, Deserialize)]
struct Data {
    id: String,
    attributes: PageAttributes,
}

#[derive(Debug, Deserialize)]
struct PageAttributes {
    #[serde(default)]
    company_name: Option<String>,
    aggregate_state: AggregateState,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum AggregateState {
    Operational,
    Degraded,
    Downtime,
    Maintenance,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Included {
    StatusPageResource {
        id: String,
        attributes: ResourceAttributes,
    },
    StatusReport {
        attributes: ReportAttributes,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ResourceAttributes {
    public_name: String,
    status: ResourceState,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ResourceState {
    Operational,
    Degraded,
    Downtime,
    Maintenance,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Deserialize)]
struct ReportAttributes {
    title: String,
    #[serde(default)]
    report_type: Option<String>,
    #[serde(default)]
    starts_at: Option<String>,
    #[serde(default)]
    ends_at: Option<String>,
    #[serde(default)]
    aggregate_state: Option<ResourceState>,
}

// ── Mapping ───────────────────────────────────────────────────────────────────

fn map_aggregate(state: AggregateState) -> Indicator {
    match state {
        AggregateState::Operational => Indicator::None,
        AggregateState::Degraded => Indicator::Minor,
        AggregateState::Downtime => Indicator::Major,
        AggregateState::Maintenance => Indicator::Maintenance,
    }
}

fn map_resource(state: ResourceState) -> ComponentStatus {
    match state {
        ResourceState::Operational => ComponentStatus::Operational,
        ResourceState::Degraded => ComponentStatus::DegradedPerformance,
        ResourceState::Downtime => ComponentStatus::MajorOutage,
        ResourceState::Maintenance => ComponentStatus::UnderMaintenance,
        ResourceState::Unrecognized => ComponentStatus::Unknown,
    }
}

fn report_severity(report: &ReportAttributes) -> Indicator {
    let from_state = match report.aggregate_state {
        Some(ResourceState::Downtime) => Indicator::Major,
        Some(ResourceState::Degraded) => Indicator::Minor,
        Some(ResourceState::Maintenance) => Indicator::Maintenance,
        Some(ResourceState::Operational | ResourceState::Unrecognized) | None => Indicator::None,
    };
    let from_type = match report.report_type.as_deref() {
        Some("maintenance") => Indicator::Maintenance,
        _ => Indicator::Minor,
    };
    from_state.worst(from_type)
}

// ── Parse ─────────────────────────────────────────────────────────────────────

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let url = endpoint(&entry.url, "index.json");
    let opts = fetcher.options_for(&url, timeout);
    let doc: Document = fetcher.get_json(&url, opts).await?;
    Ok(normalize(entry, doc))
}

fn normalize(entry: &RegistryEntry, doc: Document) -> NormalizedStatus {
    let mut components = Vec::new();
    let mut active = Vec::new();
    for item in doc.included {
        match item {
            Included::StatusPageResource { id, attributes } => {
                components.push(Component::new(id, attributes.public_name, map_resource(attributes.status)));
            }
            Included::StatusReport { attributes } if attributes.ends_at.is_none() => {
                let started = attributes.starts_at.as_deref().and_then(parse_timestamp);
                let severity = report_severity(&attributes);
                active.push(ActiveIssue::new(attributes.title, started, severity));
            }
            Included::StatusReport { .. } | Included::Other => {}
        }
    }

    let indicator = map_aggregate(doc.data.attributes.aggregate_state);
    let status = if active.is_empty() {
        StatusSummary::new(indicator, reduce::default_description(indicator))
    } else {
        let latest = reduce::summarize(&active);
        StatusSummary::new(indicator, latest.description)
    };

    let updated_at = doc
        .data
        .attributes
        .updated_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now);
    let page = PageInfo {
        id: doc.data.id,
        name: doc.data.attributes.company_name.unwrap_or_else(|| entry.name.clone()),
        url: entry.url.clone(),
        updated_at,
    };
    NormalizedStatus::new(entry, page, components, status)
}
