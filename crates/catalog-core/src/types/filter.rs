//! Equality filter for `list` queries.
//!
//! Only a fixed whitelist of indexed fields can be filtered on. Parsing
//! happens once in the facade so every backend rejects the same keys.

use std::collections::HashMap;

use crate::error::{CatalogError, CatalogResult, ErrorCode};

/// Filter keys accepted by `list`.
pub const FILTER_KEYS: [&str; 2] = ["name", "version"];

/// Equality predicates on the indexed entry fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Exact logical name.
    pub name: Option<String>,
    /// Exact version string.
    pub version: Option<String>,
}

impl EntryFilter {
    /// Filter on name only.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            version: None,
        }
    }

    /// Parse a raw key/value mapping, rejecting keys outside the whitelist.
    pub fn from_map(raw: &HashMap<String, String>) -> CatalogResult<Self> {
        let mut filter = Self::default();
        for (key, value) in raw {
            match key.as_str() {
                "name" => filter.name = Some(value.clone()),
                "version" => filter.version = Some(value.clone()),
                other => {
                    return Err(CatalogError::validation_with_suggestion(
                        format!("unsupported filter key '{}'", other),
                        ErrorCode::ValInvalidFilter,
                        format!("Filter on one of: {}", FILTER_KEYS.join(", ")),
                    ))
                }
            }
        }
        Ok(filter)
    }

    /// Whether no predicate is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.version.is_none()
    }

    /// Evaluate against a name/version pair.
    pub fn matches(&self, name: &str, version: &str) -> bool {
        self.name.as_deref().map_or(true, |n| n == name)
            && self.version.as_deref().map_or(true, |v| v == version)
    }
}
