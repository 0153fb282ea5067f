//! OpenStatus public status endpoint (`/public/status/{slug}`).
//!
//! The response is a single aggregate field; there is no component list.

use std::time::Duration;

use chrono::Utc;
use reqwest::Url;
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::registry::RegistryEntry;
use crate::status::reduce;
use crate::status::{Indicator, NormalizedStatus, StatusSummary};

const API_BASE: &str = "https://api.openstatus.dev/public/status";

#[derive(Debug, Deserialize)]
struct Payload {
    status: NativeStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NativeStatus {
    Operational,
    DegradedPerformance,
    PartialOutage,
    MajorOutage,
    UnderMaintenance,
    Incident,
    Unknown,
}

/// `None` for `unknown`, which OpenStatus reports when it has no data.
fn map_status(status: NativeStatus) -> Option<Indicator> {
    match status {
        NativeStatus::Operational => Some(Indicator::None),
        NativeStatus::DegradedPerformance => Some(Indicator::Minor),
        NativeStatus::PartialOutage | NativeStatus::Incident => Some(Indicator::Major),
        NativeStatus::MajorOutage => Some(Indicator::Critical),
        NativeStatus::UnderMaintenance => Some(Indicator::Maintenance),
        NativeStatus::Unknown => None,
    }
}

/// `https://acme.openstatus.dev` becomes the public API URL for `acme`;
/// anything else is used verbatim.
fn status_url(url: &str) -> String {
    if url.contains("/public/status/") {
        return url.to_string();
    }
    let slug = Url::parse(url).ok().and_then(|u| {
        let host = u.host_str()?.to_string();
        host.strip_suffix(".openstatus.dev").map(str::to_string)
    });
    match slug {
        Some(slug) if !slug.is_empty() && slug != "www" && slug != "api" => format!("{API_BASE}/{slug}"),
        _ => url.to_string(),
    }
}

pub(super) async fn parse(
    fetcher: &Fetcher,
    entry: &RegistryEntry,
    timeout: Duration,
) -> Result<NormalizedStatus, FetchError> {
    let url = status_url(&entry.url);
    let opts = fetcher.options_for(&url, timeout);
    let payload: Payload = fetcher.get_json(&url, opts).await?;
    normalize(entry, payload)
}

fn normalize(entry: &RegistryEntry, payload: Payload) -> Result<NormalizedStatus, FetchError> {
    let indicator = map_status(payload.status)
        .ok_or_else(|| FetchError::Schema("openstatus reported status 'unknown'".into()))?;
    Ok(NormalizedStatus::from_entry(
        entry,
        Utc::now(),
        Vec::new(),
        StatusSummary::new(indicator, reduce::default_description(indicator)),
    ))
}
