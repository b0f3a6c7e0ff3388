//! # Property Metadata Lookup
//!
//! Maps a property name to its locality and city. The enrichment stage takes
//! the lookup as an injected dependency so tests and callers can supply their own.

use crate::errors::{error_logging, AppError, AppResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Location details for one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMetadata {
    pub locality: String,
    #[serde(default)]
    pub city: Option<String>,
}

/// Source of property metadata; `None` means the property is unknown
pub trait PropertyMetadataLookup: Send + Sync {
    fn lookup(&self, property: &str) -> Option<PropertyMetadata>;
}

fn normalize_key(property: &str) -> String {
    property.trim().to_lowercase()
}

/// Lookup table held in memory, keyed case-insensitively
#[derive(Debug, Default)]
pub struct InMemoryLookup {
    entries: RwLock<HashMap<String, PropertyMetadata>>,
}

impl InMemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON object of `{ "<property>": { "locality": .., "city": .. } }`
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            error_logging::log_filesystem_error(&e, "read_property_metadata", path.to_str());
            AppError::FileSystem(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let lookup = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            entries = lookup.len(),
            "Loaded property metadata"
        );
        Ok(lookup)
    }

    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let raw: HashMap<String, PropertyMetadata> = serde_json::from_str(json)?;
        let lookup = Self::new();
        for (property, metadata) in raw {
            lookup.insert(&property, metadata);
        }
        Ok(lookup)
    }

    pub fn insert(&self, property: &str, metadata: PropertyMetadata) {
        self.entries.write().insert(normalize_key(property), metadata);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl PropertyMetadataLookup for InMemoryLookup {
    fn lookup(&self, property: &str) -> Option<PropertyMetadata> {
        let found = self.entries.read().get(&normalize_key(property)).cloned();
        if found.is_none() {
            debug!(property = %property, "No metadata for property");
        }
        found
    }
}
