//! Configuration system for catalog.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CatalogError, CatalogResult};
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::traits::{StoreConfig, StoreProvider};
use crate::versioning::VersionOrdering;

/// Seed import settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Import seed data at startup.
    pub enabled: bool,
    /// Seed file (JSON array or `.jsonl`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Upper bound for the whole import.
    pub timeout_secs: u64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
            timeout_secs: 300,
        }
    }
}

/// Main catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Backend selection and connection settings.
    pub store: StoreConfig,
    /// Seed import settings.
    pub seed: SeedConfig,
    /// How candidate versions are ordered against the current latest.
    pub version_ordering: VersionOrdering,
    /// Page size used when a caller passes a non-positive limit.
    pub default_page_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            seed: SeedConfig::default(),
            version_ordering: VersionOrdering::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> CatalogResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| CatalogError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| CatalogError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| CatalogError::Configuration(e.to_string())),
            _ => Err(CatalogError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults; unrecognized values are logged
    /// and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        // Store
        if let Some(provider) = var("CATALOG_STORE") {
            match StoreProvider::parse(&provider) {
                Some(p) => config.store.provider = p,
                None => tracing::warn!(value = %provider, "ignoring unknown CATALOG_STORE"),
            }
        }
        if let Some(url) = var("CATALOG_DATABASE_URL") {
            config.store.url = Some(url);
        }
        if let Some(name) = var("CATALOG_DATABASE_NAME") {
            config.store.database = Some(name);
        }
        if let Some(collection) = var("CATALOG_COLLECTION_NAME") {
            config.store.collection_name = collection;
        }
        if let Some(path) = var("CATALOG_SQLITE_PATH") {
            config.store.path = Some(PathBuf::from(path));
        }

        // Seed
        if let Some(flag) = var("CATALOG_SEED_IMPORT") {
            config.seed.enabled = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(path) = var("CATALOG_SEED_FILE_PATH") {
            config.seed.path = Some(PathBuf::from(path));
        }

        // Engine
        if let Some(ordering) = var("CATALOG_VERSION_ORDERING") {
            match VersionOrdering::parse(&ordering) {
                Some(o) => config.version_ordering = o,
                None => {
                    tracing::warn!(value = %ordering, "ignoring unknown CATALOG_VERSION_ORDERING")
                }
            }
        }
        if let Some(size) = var("CATALOG_PAGE_SIZE") {
            match size.parse::<usize>() {
                Ok(n) if n > 0 => config.default_page_size = n,
                _ => tracing::warn!(value = %size, "ignoring invalid CATALOG_PAGE_SIZE"),
            }
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder::default()
    }
}

/// Builder for CatalogConfig.
#[derive(Default)]
pub struct CatalogConfigBuilder {
    config: CatalogConfig,
}

impl CatalogConfigBuilder {
    /// Set store configuration.
    pub fn store(mut self, config: StoreConfig) -> Self {
        self.config.store = config;
        self
    }

    /// Set only the store provider.
    pub fn provider(mut self, provider: StoreProvider) -> Self {
        self.config.store.provider = provider;
        self
    }

    /// Enable seed import from the given file.
    pub fn seed_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.seed.enabled = true;
        self.config.seed.path = Some(path.into());
        self
    }

    /// Set version ordering.
    pub fn version_ordering(mut self, ordering: VersionOrdering) -> Self {
        self.config.version_ordering = ordering;
        self
    }

    /// Set default page size.
    pub fn default_page_size(mut self, size: usize) -> Self {
        self.config.default_page_size = size;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> CatalogConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CATALOG_STORE", "sqlite"),
            ("CATALOG_SQLITE_PATH", "/tmp/catalog.db"),
            ("CATALOG_SEED_IMPORT", "true"),
            ("CATALOG_SEED_FILE_PATH", "data/seed.json"),
            ("CATALOG_VERSION_ORDERING", "semver"),
            ("CATALOG_PAGE_SIZE", "25"),
        ]
        .into_iter()
        .collect();

        let config = CatalogConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.store.provider, StoreProvider::Sqlite);
        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/catalog.db")));
        assert!(config.seed.enabled);
        assert_eq!(config.version_ordering, VersionOrdering::Semver);
        assert_eq!(config.default_page_size, 25);
    }

    #[test]
    fn test_from_lookup_ignores_bad_values() {
        let config = CatalogConfig::from_lookup(|k| match k {
            "CATALOG_STORE" => Some("cassandra".to_string()),
            "CATALOG_PAGE_SIZE" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config.store.provider, StoreProvider::Memory);
        assert_eq!(config.default_page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "version_ordering = \"semver\"\n\n[store]\nprovider = \"mongodb\"\nurl = \"mongodb://localhost:27017\"\ndatabase = \"registry\""
        )
        .unwrap();

        let config = CatalogConfig::from_file(file.path()).unwrap();
        assert_eq!(config.store.provider, StoreProvider::MongoDB);
        assert_eq!(config.store.database.as_deref(), Some("registry"));
        assert_eq!(config.store.collection_name, "servers");
        assert_eq!(config.version_ordering, VersionOrdering::Semver);
        assert!(!config.seed.enabled);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            CatalogConfig::from_file(file.path()),
            Err(CatalogError::Configuration(_))
        ));
    }
}
