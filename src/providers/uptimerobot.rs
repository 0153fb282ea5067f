//! UptimeRobot public status pages (`/api/getMonitorList/{page}`).
//!
//! No aggregate or incident text: the indicator is derived from how many
//! monitors are down.

use std::time::Duration;

use chrono::Utc;
use reqwest::Url;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce;
use crate::status::{Component, ComponentStatus, Indicator, NormalizedStatus, StatusSummary};

#[derive(Debug, Deserialize)]
struct MonitorList {
    status: String,
    psp: Psp,
}

#[derive(Debug, Deserialize)]
struct Psp {
    monitors: Vec<RawMonitor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMonitor {
    monitor_id: u64,
    name: String,
    status_class: StatusClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StatusClass {
    Success,
    Warning,
    Danger,
    Black,
    #[serde(other)]
    Unrecognized,
}

fn map_class(class: StatusClass) -> ComponentStatus {
    match class {
        StatusClass::Success => ComponentStatus::Operational,
        StatusClass::Warning => ComponentStatus::DegradedPerformance,
        StatusClass::Danger => ComponentStatus::MajorOutage,
        StatusClass::Black | StatusClass::Unrecognized => ComponentStatus::Unknown,
    }
}

/// `https://stats.uptimerobot.com/AbCd` → `.../api/getMonitorList/AbCd`.
fn monitor_list_url(url: &str) -> String {
    if url.contains("/api/getMonitorList/") {
        return url.to_string();
    }
    match Url::parse(url) {
        Ok(parsed) => {
            let page = parsed.path().trim_matches('/');
            let origin = parsed.origin().ascii_serialization();
            format!("{origin}/api/getMonitorList/{page}")
        }
        Err(_) => url.to_string(),
    }
}

fn aggregate(classes: &[StatusClass]) -> Indicator {
    let counted = classes.iter().filter(|c| **c != StatusClass::Black).count();
    let down = classes.iter().filter(|c| **c == StatusClass::Danger).count();
    let warning = classes.iter().filter(|c| **c == StatusClass::Warning).count();
    if down > 0 && down == counted {
        Indicator::Critical
    } else if down > 0 {
        Indicator::Major
    } else if warning > 0 {
        Indicator::Minor
    } else {
        Indicator::None
    }
}

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let url = monitor_list_url(&entry.url);
    let opts = fetcher.options_for(&url, timeout);
    let list: MonitorList = fetcher.get_json(&url, opts).await?;
    normalize(entry, list)
}

fn normalize(entry: &RegistryEntry, list: MonitorList) -> Result<NormalizedStatus, FetchError> {
    if list.status != "ok" {
        return Err(FetchError::Schema(format!("uptimerobot status '{}'", list.status)));
    }
    let classes: Vec<StatusClass> = list.psp.monitors.iter().map(|m| m.status_class).collect();
    let indicator = aggregate(&classes);

    let components = list
        .psp
        .monitors
        .into_iter()
        .map(|m| Component::new(m.monitor_id.to_string(), m.name, map_class(m.status_class)))
        .collect();

    let down = classes.iter().filter(|c| **c == StatusClass::Danger).count();
    let description = match indicator {
        Indicator::Major | Indicator::Critical => format!("{down} of {} monitors down", classes.len()),
        other => reduce::default_description(other).to_string(),
    };
    Ok(NormalizedStatus::from_entry(
        entry,
        Utc::now(),
        components,
        StatusSummary::new(indicator, description),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> RegistryEntry {
        RegistryEntry::new("Robo", "https://stats.uptimerobot.com/AbCd", "Monitoring", Some("uptimerobot"))
    }

    fn decode(json: &str) -> MonitorList {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn page_url_rewritten() {
        assert_eq!(
            monitor_list_url("https://stats.uptimerobot.com/AbCd"),
            "https://stats.uptimerobot.com/api/getMonitorList/AbCd"
        );
    }

    #[test]
    fn all_up_is_operational() {
        let s = normalize(
            &entry(),
            decode(r#"{"status":"ok","psp":{"monitors":[{"monitorId":1,"name":"Web","statusClass":"success"}]}}"#),
        )
        .unwrap();
        assert_eq!(s.status.indicator, Indicator::None);
        assert_eq!(s.components[0].id, "1");
    }

    #[test]
    fn some_down_is_major() {
        let s = normalize(
            &entry(),
            decode(
                r#"{"status":"ok","psp":{"monitors":[
                    {"monitorId":1,"name":"Web","statusClass":"success"},
                    {"monitorId":2,"name":"API","statusClass":"danger"},
                    {"monitorId":3,"name":"Old","statusClass":"black"}]}}"#,
            ),
        )
        .unwrap();
        assert_eq!(s.status.indicator, Indicator::Major);
        assert_eq!(s.status.description, "1 of 3 monitors down");
    }

    #[test]
    fn every_active_monitor_down_is_critical() {
        assert_eq!(aggregate(&[StatusClass::Danger, StatusClass::Black]), Indicator::Critical);
    }

    #[test]
    fn non_ok_envelope_fails() {
        let r = normalize(&entry(), decode(r#"{"status":"fail","psp":{"monitors":[]}}"#));
        assert!(matches!(r, Err(FetchError::Schema(_))));
    }
}
