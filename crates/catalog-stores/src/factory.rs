//! Factory for creating entry store backends.

use std::sync::Arc;
use std::time::Duration;

use catalog_core::error::{CatalogError, CatalogResult};
use catalog_core::store::InMemoryEntryStore;
use catalog_core::traits::{EntryStore, StoreConfig, StoreProvider};

/// Factory for creating entry store backends.
pub struct StoreFactory;

impl StoreFactory {
    /// Create the backend selected by `config.provider`.
    ///
    /// Connecting is bounded by `config.connect_timeout_secs`.
    pub async fn create(config: &StoreConfig) -> CatalogResult<Arc<dyn EntryStore>> {
        let timeout = Duration::from_secs(config.connect_timeout_secs);
        tracing::info!(provider = %config.provider, "creating entry store");

        match tokio::time::timeout(timeout, Self::connect(config)).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::connection(format!(
                "timed out after {}s connecting to {} store",
                config.connect_timeout_secs, config.provider
            ))),
        }
    }

    async fn connect(config: &StoreConfig) -> CatalogResult<Arc<dyn EntryStore>> {
        match config.provider {
            StoreProvider::Memory => Ok(Arc::new(InMemoryEntryStore::new())),

            #[cfg(feature = "sqlite")]
            StoreProvider::Sqlite => {
                let store = crate::sqlite::SqliteEntryStore::from_config(config)?;
                Ok(Arc::new(store))
            }

            #[cfg(feature = "mongodb")]
            StoreProvider::MongoDB => {
                let store = crate::mongodb::MongoEntryStore::connect(config).await?;
                Ok(Arc::new(store))
            }

            #[allow(unreachable_patterns)]
            provider => Err(CatalogError::UnsupportedProvider {
                provider: provider.to_string(),
            }),
        }
    }

    /// Create an in-memory store.
    pub fn memory() -> Arc<dyn EntryStore> {
        Arc::new(InMemoryEntryStore::new())
    }

    /// Create a SQLite store at `path`.
    #[cfg(feature = "sqlite")]
    pub fn sqlite(path: impl AsRef<std::path::Path>) -> CatalogResult<Arc<dyn EntryStore>> {
        let store = crate::sqlite::SqliteEntryStore::open(path)?;
        Ok(Arc::new(store))
    }
}
