//! Active-issue reduction for event-list providers.
//!
//! Providers filter out resolved items themselves (each has its own
//! resolution markers) and hand the remainder here.  The most recently
//! started issue supplies the description; its severity is whatever the
//! provider computed as the worst of that record's own fields.

use chrono::{DateTime, Utc};

use super::{Indicator, StatusSummary};

/// One unresolved upstream incident/event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveIssue {
    pub title: String,
    pub started_at: Option<DateTime<Utc>>,
    pub severity: Indicator,
}

impl ActiveIssue {
    pub fn new(title: impl Into<String>, started_at: Option<DateTime<Utc>>, severity: Indicator) -> Self {
        Self { title: title.into(), started_at, severity }
    }
}

/// Collapse active issues into one summary.
///
/// Empty input is operational.  Issues without a start time rank oldest;
/// among equal start times the first in upstream order wins.
pub fn summarize(issues: &[ActiveIssue]) -> StatusSummary {
    let mut latest: Option<&ActiveIssue> = None;
    for issue in issues {
        latest = match latest {
            Some(current) if issue.started_at <= current.started_at => Some(current),
            _ => Some(issue),
        };
    }

    match latest {
        None => StatusSummary::operational(),
        Some(issue) => {
            let description = if issue.title.trim().is_empty() {
                default_description(issue.severity).to_string()
            } else {
                issue.title.trim().to_string()
            };
            StatusSummary::new(issue.severity, description)
        }
    }
}

/// Fallback wording when an upstream issue has no usable title.
pub fn default_description(indicator: Indicator) -> &'static str {
    match indicator {
        Indicator::None => StatusSummary::OPERATIONAL,
        Indicator::Minor => "Degraded performance",
        Indicator::Major => "Partial outage",
        Indicator::Critical => "Major outage",
        Indicator::Maintenance => "Under maintenance",
        Indicator::External => "External status page",
        Indicator::Error => "Error fetching status",
    }
}

/// Keyword severity for free-text providers (feeds, titles).
///
/// Checked in order: outage/down → major, degraded/partial/delay → minor,
/// maintenance → maintenance.  Anything else is `fallback`.
pub fn keyword_severity(text: &str, fallback: Indicator) -> Indicator {
    let lower = text.to_lowercase();
    if ["outage", "down", "unavailable", "disruption"].iter().any(|k| lower.contains(k)) {
        Indicator::Major
    } else if ["degraded", "partial", "delay", "elevated", "slow", "intermittent"]
        .iter()
        .any(|k| lower.contains(k))
    {
        Indicator::Minor
    } else if lower.contains("maintenance") {
        Indicator::Maintenance
    } else {
        fallback
    }
}
