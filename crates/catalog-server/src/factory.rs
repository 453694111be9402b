//! Building a catalog from configuration.

use std::time::Duration;

use catalog_core::config::{CatalogConfig, SeedConfig};
use catalog_core::{Catalog, CatalogResult, OpContext, SeedReport};
use catalog_stores::StoreFactory;

/// Create the configured backend and wrap it in a [`Catalog`].
pub async fn create_catalog(config: &CatalogConfig) -> CatalogResult<Catalog> {
    let store = StoreFactory::create(&config.store).await?;
    Ok(Catalog::from_config(config, store))
}

/// Import seed data when enabled.
///
/// Returns `Ok(None)` when seeding is disabled or no file is configured.
pub async fn import_seed(catalog: &Catalog, seed: &SeedConfig) -> CatalogResult<Option<SeedReport>> {
    let path = match (&seed.enabled, &seed.path) {
        (true, Some(path)) => path,
        (true, None) => {
            tracing::warn!("seed import enabled but no seed file configured");
            return Ok(None);
        }
        _ => return Ok(None),
    };

    let ctx = OpContext::with_timeout(Duration::from_secs(seed.timeout_secs));
    let report = catalog.import_seed(&ctx, path).await?;
    Ok(Some(report))
}
