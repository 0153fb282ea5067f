//! PlayStation Network.  No public machine-readable endpoint, so the record
//! is always external-only and no request is made.

use crate::registry::RegistryEntry;
use crate::status::NormalizedStatus;
use crate::status::fallback;

const DESCRIPTION: &str = "See PlayStation Network service status";

pub(super) fn parse(entry: &RegistryEntry) -> NormalizedStatus {
    fallback::external_status_with(entry, DESCRIPTION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Indicator;

    #[test]
    fn always_external() {
        let entry = RegistryEntry::new("PSN", "https://status.playstation.com", "Gaming", Some("playstation"));
        let s = parse(&entry);
        assert_eq!(s.status.indicator, Indicator::External);
        assert_eq!(s.status.description, DESCRIPTION);
        assert!(s.components.is_empty());
    }
}
