//! Instatus public pages: `summary.json` plus `v2/components.json`.
//!
//! Both requests run concurrently; either failing fails the parse.  The
//! indicator is the worse of the page aggregate and the newest active
//! incident's impact.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, PageInfo, StatusSummary, parse_timestamp, slug};

use super::endpoint;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    page: Page,
    #[serde(default)]
    active_incidents: Vec<RawIncident>,
    #[serde(default)]
    active_maintenances: Vec<RawMaintenance>,
}

#[derive(Debug, Deserialize)]
struct Page {
    name: String,
    #[serde(default)]
    url: Option<String>,
    status: PageState,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum PageState {
    Up,
    HasIssues,
    UnderMaintenance,
}

#[derive(Debug, Deserialize)]
struct RawIncident {
    name: String,
    #[serde(default)]
    started: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    impact: Option<Impact>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum Impact {
    Operational,
    DegradedPerformance,
    PartialOutage,
    MajorOutage,
    UnderMaintenance,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Deserialize)]
struct RawMaintenance {
    name: String,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ComponentsPayload {
    Wrapped { components: Vec<RawComponent> },
    Bare(Vec<RawComponent>),
}

impl ComponentsPayload {
    fn into_vec(self) -> Vec<RawComponent> {
        match self {
            ComponentsPayload::Wrapped { components } | ComponentsPayload::Bare(components) => components,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawComponent {
    id: String,
    name: String,
    status: Impact,
}

// ── Mapping ───────────────────────────────────────────────────────────────────

fn map_page(state: PageState) -> Indicator {
    match state {
        PageState::Up => Indicator::None,
        PageState::HasIssues => Indicator::Minor,
        PageState::UnderMaintenance => Indicator::Maintenance,
    }
}

fn map_impact(impact: Impact) -> Indicator {
    match impact {
        Impact::Operational | Impact::Unrecognized => Indicator::None,
        Impact::DegradedPerformance => Indicator::Minor,
        Impact::PartialOutage => Indicator::Major,
        Impact::MajorOutage => Indicator::Critical,
        Impact::UnderMaintenance => Indicator::Maintenance,
    }
}

fn map_component(status: Impact) -> ComponentStatus {
    match status {
        Impact::Operational => ComponentStatus::Operational,
        Impact::DegradedPerformance => ComponentStatus::DegradedPerformance,
        Impact::PartialOutage => ComponentStatus::PartialOutage,
        Impact::MajorOutage => ComponentStatus::MajorOutage,
        Impact::UnderMaintenance => ComponentStatus::UnderMaintenance,
        Impact::Unrecognized => ComponentStatus::Unknown,
    }
}

fn is_resolved(status: Option<&str>) -> bool {
    matches!(status, Some(s) if s.eq_ignore_ascii_case("RESOLVED") || s.eq_ignore_ascii_case("COMPLETED"))
}

fn base_url(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    trimmed.strip_suffix("/summary.json").unwrap_or(trimmed)
}

// ── Parse ─────────────────────────────────────────────────────────────────────

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let base = base_url(&entry.url);
    let summary_url = endpoint(base, "summary.json");
    let components_url = endpoint(base, "v2/components.json");

    let (summary, components) = tokio::try_join!(
        fetcher.get_json::<Summary>(&summary_url, fetcher.options_for(&summary_url, timeout)),
        fetcher.get_json::<ComponentsPayload>(&components_url, fetcher.options_for(&components_url, timeout)),
    )?;
    Ok(normalize(entry, summary, components.into_vec()))
}

fn normalize(entry: &RegistryEntry, summary: Summary, components: Vec<RawComponent>) -> NormalizedStatus {
    let components = components
        .into_iter()
        .map(|c| Component::new(c.id, c.name, map_component(c.status)))
        .collect();

    let mut active: Vec<ActiveIssue> = summary
        .active_incidents
        .into_iter()
        .filter(|i| !is_resolved(i.status.as_deref()))
        .map(|i| {
            let severity = i.impact.map(map_impact).unwrap_or(Indicator::Minor);
            ActiveIssue::new(i.name, i.started.as_deref().and_then(parse_timestamp), severity)
        })
        .collect();
    active.extend(
        summary
            .active_maintenances
            .into_iter()
            .filter(|m| !is_resolved(m.status.as_deref()))
            .filter(|m| !matches!(m.status.as_deref(), Some("NOTSTARTEDYET")))
            .map(|m| ActiveIssue::new(m.name, m.start.as_deref().and_then(parse_timestamp), Indicator::Maintenance)),
    );

    let aggregate = map_page(summary.page.status);
    let status = if active.is_empty() {
        StatusSummary::new(aggregate, reduce::default_description(aggregate))
    } else {
        let latest = reduce::summarize(&active);
        StatusSummary::new(aggregate.worst(latest.indicator), latest.description)
    };

    let page = PageInfo {
        id: slug(&summary.page.name),
        name: summary.page.name,
        url: summary.page.url.unwrap_or_else(|| entry.url.clone()),
        updated_at: Utc::now(),
    };
    NormalizedStatus::new(entry, page, components, status)
}
