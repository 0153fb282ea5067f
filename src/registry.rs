//! Static service registry.
//!
//! A JSON array of `{name, url, category, statusPageType?}` records loaded
//! once at startup.  The registry is immutable afterwards and cheap to clone.
//! `name` is the identity key used by the cache and the read API; uniqueness
//! is enforced by the registry tooling, not here.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AppError;

/// One configured service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub name: String,
    pub url: String,
    pub category: String,
    /// Provider tag selecting the parser; `None` means "try Atlassian".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_page_type: Option<String>,
}

impl RegistryEntry {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        category: impl Into<String>,
        status_page_type: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            category: category.into(),
            status_page_type: status_page_type.map(str::to_string),
        }
    }

    /// Provider tag, trimmed and lowercased; blank tags count as unset.
    pub fn tag(&self) -> Option<String> {
        self.status_page_type
            .as_deref()
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
    }
}

/// Shared, read-only list of registry entries.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Arc<[RegistryEntry]>,
}

impl Registry {
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.name.as_str()) {
                debug!(name = %entry.name, "duplicate registry name");
            }
        }
        Self { entries: entries.into() }
    }

    /// Load the registry from a JSON file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| AppError::Registry(format!("cannot read {}: {e}", path.display())))?;
        let registry = Self::from_json(&raw)
            .map_err(|e| AppError::Registry(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), services = registry.len(), "registry loaded");
        Ok(registry)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<RegistryEntry> = serde_json::from_str(raw)?;
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn find(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
