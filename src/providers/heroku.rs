//! Heroku status API v4 (`/api/v4/current-status`).
//!
//! Systems report traffic-light colours; an incident is resolved once its
//! newest update has `update_type = resolved`.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce::{self, ActiveIssue};
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, StatusSummary, parse_timestamp, slug, worst_component};

use super::endpoint;

#[derive(Debug, Deserialize)]
struct CurrentStatus {
    status: Vec<SystemStatus>,
    #[serde(default)]
    incidents: Vec<RawIncident>,
}

#[derive(Debug, Deserialize)]
struct SystemStatus {
    system: String,
    status: Colour,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Colour {
    Green,
    Yellow,
    Red,
    Blue,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Deserialize)]
struct RawIncident {
    title: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updates: Vec<RawUpdate>,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
    update_type: UpdateType,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum UpdateType {
    Issue,
    Update,
    Monitoring,
    Resolved,
    Scheduled,
    #[serde(other)]
    Other,
}

fn map_colour(colour: Colour) -> ComponentStatus {
    match colour {
        Colour::Green => ComponentStatus::Operational,
        Colour::Yellow => ComponentStatus::DegradedPerformance,
        Colour::Red => ComponentStatus::MajorOutage,
        Colour::Blue => ComponentStatus::UnderMaintenance,
        Colour::Unrecognized => ComponentStatus::Unknown,
    }
}

/// Updates arrive newest-first, but order by timestamp when present.
fn latest_update(incident: &RawIncident) -> Option<UpdateType> {
    let dated = incident
        .updates
        .iter()
        .filter_map(|u| u.created_at.as_deref().and_then(parse_timestamp).map(|t| (t, u.update_type)))
        .max_by_key(|(t, _)| *t)
        .map(|(_, kind)| kind);
    dated.or_else(|| incident.updates.first().map(|u| u.update_type))
}

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let url = if entry.url.contains("/api/") {
        entry.url.clone()
    } else {
        endpoint(&entry.url, "api/v4/current-status")
    };
    let opts = fetcher.options_for(&url, timeout);
    let current: CurrentStatus = fetcher.get_json(&url, opts).await?;
    Ok(normalize(entry, current))
}

fn normalize(entry: &RegistryEntry, current: CurrentStatus) -> NormalizedStatus {
    let components: Vec<Component> = current
        .status
        .into_iter()
        .map(|s| Component::new(slug(&s.system), s.system, map_colour(s.status)))
        .collect();
    let aggregate = worst_component(&components);

    let active: Vec<ActiveIssue> = current
        .incidents
        .into_iter()
        .filter(|i| latest_update(i) != Some(UpdateType::Resolved))
        .map(|i| {
            let severity = match latest_update(&i) {
                Some(UpdateType::Scheduled) => Indicator::Maintenance,
                _ => aggregate.worst(Indicator::Minor),
            };
            ActiveIssue::new(i.title, i.created_at.as_deref().and_then(parse_timestamp), severity)
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

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> RegistryEntry {
        RegistryEntry::new("Heroku", "https://status.heroku.com", "Hosting", Some("heroku"))
    }

    fn decode(json: &str) -> CurrentStatus {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn all_green() {
        let s = normalize(
            &entry(),
            decode(r#"{"status":[{"system":"Apps","status":"green"},{"system":"Data","status":"green"}],"incidents":[]}"#),
        );
        assert_eq!(s.status.indicator, Indicator::None);
        assert_eq!(s.components.len(), 2);
        assert_eq!(s.components[0].id, "apps");
    }

    #[test]
    fn red_system_with_open_incident() {
        let s = normalize(
            &entry(),
            decode(
                r#"{"status":[{"system":"Apps","status":"red"},{"system":"Data","status":"green"}],
                    "incidents":[
                      {"title":"Dyno restarts failing","created_at":"2024-04-01T10:00:00Z",
                       "updates":[{"update_type":"update","created_at":"2024-04-01T11:00:00Z"},
                                  {"update_type":"issue","created_at":"2024-04-01T10:00:00Z"}]},
                      {"title":"Old","created_at":"2024-04-02T10:00:00Z",
                       "updates":[{"update_type":"resolved","created_at":"2024-04-02T12:00:00Z"}]}
                    ]}"#,
            ),
        );
        assert_eq!(s.status.indicator, Indicator::Critical);
        assert_eq!(s.status.description, "Dyno restarts failing");
    }

    #[test]
    fn missing_status_list_rejected() {
        assert!(serde_json::from_str::<CurrentStatus>(r#"{"incidents":[]}"#).is_err());
    }
}
