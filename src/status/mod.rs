//! Normalized status model.
//!
//! Every provider reduces its upstream payload to a [`NormalizedStatus`].
//! Provider-native vocabularies never leak past this type: severities are
//! collapsed into [`Indicator`] and component states into [`ComponentStatus`].
//!
//! - **fallback**: error / external / operational record constructors.
//! - **reduce**: active-issue reduction shared by event-list providers.

pub mod fallback;
pub mod reduce;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::RegistryEntry;

// ── Indicator ─────────────────────────────────────────────────────────────────

/// Fixed severity enum every provider is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    None,
    Minor,
    Major,
    Critical,
    Maintenance,
    /// No machine-readable API; the dashboard links out instead.
    External,
    /// Upstream could not be reached or parsed.
    Error,
}

impl Indicator {
    pub const ALL: [Indicator; 7] = [
        Indicator::None,
        Indicator::Minor,
        Indicator::Major,
        Indicator::Critical,
        Indicator::Maintenance,
        Indicator::External,
        Indicator::Error,
    ];

    /// Rank used when several fields of one record disagree.
    ///
    /// `none < maintenance < minor < major < critical`.  `external` and
    /// `error` are never produced by severity mapping and rank with `none`.
    pub fn severity(self) -> u8 {
        match self {
            Indicator::None | Indicator::External | Indicator::Error => 0,
            Indicator::Maintenance => 1,
            Indicator::Minor => 2,
            Indicator::Major => 3,
            Indicator::Critical => 4,
        }
    }

    /// The more severe of two indicators; `self` wins ties.
    pub fn worst(self, other: Indicator) -> Indicator {
        if other.severity() > self.severity() { other } else { self }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Indicator::None => "none",
            Indicator::Minor => "minor",
            Indicator::Major => "major",
            Indicator::Critical => "critical",
            Indicator::Maintenance => "maintenance",
            Indicator::External => "external",
            Indicator::Error => "error",
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Components ────────────────────────────────────────────────────────────────

/// Normalized state of one upstream sub-system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Operational,
    DegradedPerformance,
    PartialOutage,
    MajorOutage,
    UnderMaintenance,
    Unknown,
}

impl ComponentStatus {
    pub fn indicator(self) -> Indicator {
        match self {
            ComponentStatus::Operational | ComponentStatus::Unknown => Indicator::None,
            ComponentStatus::DegradedPerformance => Indicator::Minor,
            ComponentStatus::PartialOutage => Indicator::Major,
            ComponentStatus::MajorOutage => Indicator::Critical,
            ComponentStatus::UnderMaintenance => Indicator::Maintenance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub status: ComponentStatus,
}

impl Component {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: ComponentStatus) -> Self {
        Self { id: id.into(), name: name.into(), status }
    }
}

/// Worst indicator across a component list; `none` when empty.
pub fn worst_component(components: &[Component]) -> Indicator {
    components
        .iter()
        .map(|c| c.status.indicator())
        .fold(Indicator::None, Indicator::worst)
}

// ── Page / summary ────────────────────────────────────────────────────────────

/// Identity and last-change timestamp of the upstream page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    pub name: String,
    pub url: String,
    pub updated_at: DateTime<Utc>,
}

impl PageInfo {
    /// Page identity derived from the registry entry.
    pub fn for_entry(entry: &RegistryEntry, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: slug(&entry.name),
            name: entry.name.clone(),
            url: entry.url.clone(),
            updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub description: String,
    pub indicator: Indicator,
}

impl StatusSummary {
    pub const OPERATIONAL: &'static str = "All systems operational";

    pub fn new(indicator: Indicator, description: impl Into<String>) -> Self {
        Self { description: description.into(), indicator }
    }

    pub fn operational() -> Self {
        Self::new(Indicator::None, Self::OPERATIONAL)
    }
}

// ── NormalizedStatus ──────────────────────────────────────────────────────────

/// One service's point-in-time health snapshot.
///
/// `name`, `url`, `category` and `status_page_type` always come from the
/// registry entry, never from upstream data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedStatus {
    pub page: PageInfo,
    pub components: Vec<Component>,
    pub status: StatusSummary,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_page_type: Option<String>,
    pub url: String,
    pub name: String,
}

impl NormalizedStatus {
    pub fn new(
        entry: &RegistryEntry,
        page: PageInfo,
        components: Vec<Component>,
        status: StatusSummary,
    ) -> Self {
        Self {
            page,
            components,
            status,
            category: entry.category.clone(),
            status_page_type: entry.status_page_type.clone(),
            url: entry.url.clone(),
            name: entry.name.clone(),
        }
    }

    /// Record whose page identity is derived from the registry entry.
    pub fn from_entry(
        entry: &RegistryEntry,
        updated_at: DateTime<Utc>,
        components: Vec<Component>,
        status: StatusSummary,
    ) -> Self {
        Self::new(entry, PageInfo::for_entry(entry, updated_at), components, status)
    }

    pub fn indicator(&self) -> Indicator {
        self.status.indicator
    }
}

/// Lowercase, dash-separated identifier.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Parse an upstream RFC 3339 timestamp, tolerating a missing offset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}
