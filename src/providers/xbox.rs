//! Xbox Live service status (`servicestatusv6`).
//!
//! Core services contain scenarios, scenarios contain incidents.  Incidents
//! with no `End` are active; each core service becomes one component.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, parse_timestamp};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceStatus {
    core_services: Vec<CoreService>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CoreService {
    id: serde_json::Value,
    name: String,
    status: NamedStatus,
    #[serde(default)]
    scenarios: Vec<Scenario>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Scenario {
    name: String,
    status: NamedStatus,
    #[serde(default)]
    incidents: Vec<RawIncident>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NamedStatus {
    name: StatusName,
}

#[derive(Debug, Clone, Copy, Deserialize)]
enum StatusName {
    None,
    Limited,
    Impacted,
    Major,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawIncident {
    #[serde(default)]
    begin: Option<String>,
    #[serde(default)]
    end: Option<String>,
}

fn map_status(name: StatusName) -> Indicator {
    match name {
        StatusName::None | StatusName::Unrecognized => Indicator::None,
        StatusName::Limited => Indicator::Minor,
        StatusName::Impacted => Indicator::Major,
        StatusName::Major => Indicator::Critical,
    }
}

fn map_component(name: StatusName) -> ComponentStatus {
    match name {
        StatusName::None => ComponentStatus::Operational,
        StatusName::Limited => ComponentStatus::DegradedPerformance,
        StatusName::Impacted => ComponentStatus::PartialOutage,
        StatusName::Major => ComponentStatus::MajorOutage,
        StatusName::Unrecognized => ComponentStatus::Unknown,
    }
}

fn id_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let opts = fetcher.options_for(&entry.url, timeout);
    let status: ServiceStatus = fetcher.get_json(&entry.url, opts).await?;
    Ok(normalize(entry, status))
}

fn normalize(entry: &RegistryEntry, status: ServiceStatus) -> NormalizedStatus {
    let mut components = Vec::with_capacity(status.core_services.len());
    let mut active = Vec::new();
    for service in status.core_services {
        components.push(Component::new(id_string(&service.id), service.name.clone(), map_component(service.status.name)));
        let service_level = map_status(service.status.name);
        for scenario in service.scenarios {
            let severity = service_level.worst(map_status(scenario.status.name)).worst(Indicator::Minor);
            for incident in scenario.incidents.iter().filter(|i| i.end.is_none()) {
                let started = incident.begin.as_deref().and_then(parse_timestamp);
                let title = format!("{}: {}", service.name, scenario.name);
                active.push(ActiveIssue::new(title, started, severity));
            }
        }
    }
    NormalizedStatus::from_entry(entry, Utc::now(), components, reduce::summarize(&active))
}
