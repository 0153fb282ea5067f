//! Uniform records for services without real upstream data.

use chrono::Utc;

use crate::registry::RegistryEntry;

use super::{Indicator, NormalizedStatus, StatusSummary};

pub const ERROR_DESCRIPTION: &str = "Error fetching status";
pub const EXTERNAL_DESCRIPTION: &str = "External status page";

/// Record for a service whose provider could not be reached or parsed.
pub fn error_status(entry: &RegistryEntry) -> NormalizedStatus {
    NormalizedStatus::from_entry(
        entry,
        Utc::now(),
        Vec::new(),
        StatusSummary::new(Indicator::Error, ERROR_DESCRIPTION),
    )
}

/// Record for a service with no machine-readable status API.
pub fn external_status(entry: &RegistryEntry) -> NormalizedStatus {
    external_status_with(entry, EXTERNAL_DESCRIPTION)
}

pub fn external_status_with(entry: &RegistryEntry, description: &str) -> NormalizedStatus {
    NormalizedStatus::from_entry(
        entry,
        Utc::now(),
        Vec::new(),
        StatusSummary::new(Indicator::External, description),
    )
}

/// Assumed-healthy record for providers whose failures are masked.
pub fn operational_status(entry: &RegistryEntry) -> NormalizedStatus {
    NormalizedStatus::from_entry(entry, Utc::now(), Vec::new(), StatusSummary::operational())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> RegistryEntry {
        RegistryEntry::new("Beta", "https://status.beta.com", "Dev", Some("custom"))
    }

    #[test]
    fn error_record_shape() {
        let s = error_status(&entry());
        assert_eq!(s.status.indicator, Indicator::Error);
        assert_eq!(s.status.description, "Error fetching status");
        assert!(s.components.is_empty());
        assert_eq!(s.name, "Beta");
        assert_eq!(s.category, "Dev");
        assert_eq!(s.status_page_type.as_deref(), Some("custom"));
    }

    #[test]
    fn external_record_shape() {
        let s = external_status(&entry());
        assert_eq!(s.status.indicator, Indicator::External);
        assert_eq!(s.status.description, "External status page");
        assert!(s.components.is_empty());
        assert_eq!(s.url, "https://status.beta.com");
    }

    #[test]
    fn operational_record_shape() {
        let s = operational_status(&entry());
        assert_eq!(s.status.indicator, Indicator::None);
        assert_eq!(s.status.description, "All systems operational");
    }
}
