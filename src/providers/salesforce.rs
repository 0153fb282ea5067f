//! Salesforce Trust (`/v1/incidents/active`).
//!
//! Each incident lists impacts; an impact without `endTime` is still
//! ongoing.  Affected instance keys are surfaced as components.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, parse_timestamp};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIncident {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default)]
    instance_keys: Vec<String>,
    #[serde(default)]
    affects_all: bool,
    #[serde(default, rename = "IncidentImpacts")]
    impacts: Vec<RawImpact>,
    #[serde(default, rename = "IncidentEvents")]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawImpact {
    #[serde(rename = "type")]
    kind: ImpactType,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum ImpactType {
    ServiceDisruption,
    PerformanceDegradation,
    FeatureDisruption,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

fn impact_severity(kind: ImpactType, affects_all: bool) -> Indicator {
    match kind {
        ImpactType::ServiceDisruption if affects_all => Indicator::Critical,
        ImpactType::ServiceDisruption => Indicator::Major,
        ImpactType::PerformanceDegradation | ImpactType::FeatureDisruption | ImpactType::Other => Indicator::Minor,
    }
}

fn component_for(severity: Indicator) -> ComponentStatus {
    match severity {
        Indicator::Critical => ComponentStatus::MajorOutage,
        Indicator::Major => ComponentStatus::PartialOutage,
        _ => ComponentStatus::DegradedPerformance,
    }
}

/// First line of the newest event message, or a generic label.
fn incident_title(incident: &RawIncident) -> String {
    let newest = incident
        .events
        .iter()
        .filter(|e| e.message.as_deref().is_some_and(|m| !m.trim().is_empty()))
        .max_by_key(|e| e.created_at.as_deref().and_then(parse_timestamp));
    match newest.and_then(|e| e.message.as_deref()) {
        Some(message) => message.lines().next().unwrap_or(message).trim().to_string(),
        None => match &incident.id {
            serde_json::Value::Null => "Active incident".to_string(),
            id => format!("Incident {}", id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string())),
        },
    }
}

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let opts = fetcher.options_for(&entry.url, timeout);
    let incidents: Vec<RawIncident> = fetcher.get_json(&entry.url, opts).await?;
    Ok(normalize(entry, incidents))
}

fn normalize(entry: &RegistryEntry, incidents: Vec<RawIncident>) -> NormalizedStatus {
    let mut components: Vec<Component> = Vec::new();
    let mut active = Vec::new();
    for incident in &incidents {
        let ongoing: Vec<&RawImpact> = incident.impacts.iter().filter(|i| i.end_time.is_none()).collect();
        if ongoing.is_empty() {
            continue;
        }
        let severity = ongoing
            .iter()
            .map(|i| impact_severity(i.kind, incident.affects_all))
            .fold(Indicator::None, Indicator::worst);
        let started: Option<DateTime<Utc>> = ongoing
            .iter()
            .filter_map(|i| i.start_time.as_deref().and_then(parse_timestamp))
            .min();

        for key in &incident.instance_keys {
            let status = component_for(severity);
            match components.iter_mut().find(|c| c.id == *key) {
                Some(existing) if status.indicator().severity() > existing.status.indicator().severity() => {
                    existing.status = status;
                }
                Some(_) => {}
                None => components.push(Component::new(key.clone(), key.clone(), status)),
            }
        }
        active.push(ActiveIssue::new(incident_title(incident), started, severity));
    }
    NormalizedStatus::from_entry(entry, Utc::now(), components, reduce::summarize(&active))
}
