//! Google Cloud status (`incidents.json`).
//!
//! Best-effort: the provider's fallback policy is operational, so any
//! failure here is reported as healthy.  Incidents without `end` are
//! active; their affected products become components.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, parse_timestamp};

use super::endpoint;

#[derive(Debug, Deserialize)]
struct RawIncident {
    external_desc: String,
    #[serde(default)]
    begin: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    status_impact: Option<StatusImpact>,
    #[serde(default)]
    affected_products: Vec<Product>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Severity {
    High,
    Medium,
    Low,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum StatusImpact {
    ServiceOutage,
    ServiceDisruption,
    ServiceInformation,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Deserialize)]
struct Product {
    id: String,
    title: String,
}

fn map_severity(severity: Option<Severity>) -> Indicator {
    match severity {
        Some(Severity::High) => Indicator::Major,
        Some(Severity::Medium | Severity::Low | Severity::Unrecognized) | None => Indicator::Minor,
    }
}

fn map_impact(impact: Option<StatusImpact>) -> Indicator {
    match impact {
        Some(StatusImpact::ServiceOutage) => Indicator::Major,
        Some(StatusImpact::ServiceDisruption | StatusImpact::ServiceInformation | StatusImpact::Unrecognized)
        | None => Indicator::Minor,
    }
}

fn component_for(severity: Indicator) -> ComponentStatus {
    match severity {
        Indicator::Critical => ComponentStatus::MajorOutage,
        Indicator::Major => ComponentStatus::PartialOutage,
        _ => ComponentStatus::DegradedPerformance,
    }
}

fn incidents_url(url: &str) -> String {
    if url.ends_with(".json") {
        url.to_string()
    } else {
        endpoint(url, "incidents.json")
    }
}

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let url = incidents_url(&entry.url);
    let opts = fetcher.options_for(&url, timeout);
    let incidents: Vec<RawIncident> = fetcher.get_json(&url, opts).await?;
    Ok(normalize(entry, incidents))
}

fn normalize(entry: &RegistryEntry, incidents: Vec<RawIncident>) -> NormalizedStatus {
    let mut components: Vec<Component> = Vec::new();
    let mut active = Vec::new();
    for incident in incidents.into_iter().filter(|i| i.end.is_none()) {
        let severity = map_severity(incident.severity).worst(map_impact(incident.status_impact));
        for product in incident.affected_products {
            if !components.iter().any(|c| c.id == product.id) {
                components.push(Component::new(product.id, product.title, component_for(severity)));
            }
        }
        let started = incident.begin.as_deref().and_then(parse_timestamp);
        active.push(ActiveIssue::new(incident.external_desc, started, severity));
    }
    NormalizedStatus::from_entry(entry, Utc::now(), components, reduce::summarize(&active))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> RegistryEntry {
        RegistryEntry::new("Google Cloud", "https://status.cloud.google.com", "Cloud", Some("google-cloud"))
    }

    fn decode(json: &str) -> Vec<RawIncident> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn closed_incidents_ignored() {
        let s = normalize(
            &entry(),
            decode(
                r#"[{"external_desc":"Old BigQuery issue","begin":"2024-03-01T10:00:00+00:00","end":"2024-03-01T12:00:00+00:00",
                     "severity":"high","status_impact":"SERVICE_OUTAGE","affected_products":[{"title":"BigQuery","id":"bq"}]}]"#,
            ),
        );
        assert_eq!(s.status.indicator, Indicator::None);
        assert!(s.components.is_empty());
    }

    #[test]
    fn open_outage_reported() {
        let s = normalize(
            &entry(),
            decode(
                r#"[{"external_desc":"Cloud SQL connectivity issues","begin":"2024-04-01T10:00:00+00:00",
                     "severity":"medium","status_impact":"SERVICE_OUTAGE",
                     "affected_products":[{"title":"Cloud SQL","id":"sql"}]}]"#,
            ),
        );
        assert_eq!(s.status.indicator, Indicator::Major);
        assert_eq!(s.status.description, "Cloud SQL connectivity issues");
        assert_eq!(s.components[0].status, ComponentStatus::PartialOutage);
    }

    #[test]
    fn default_path_is_incidents_json() {
        assert_eq!(incidents_url("https://status.cloud.google.com"), "https://status.cloud.google.com/incidents.json");
    }
}
