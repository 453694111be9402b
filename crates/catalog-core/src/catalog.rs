//! The catalog facade: list, get, publish, seed and close over one backend.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::CatalogConfig;
use crate::context::OpContext;
use crate::error::{CatalogError, CatalogResult};
use crate::import::{SeedImporter, SeedReport};
use crate::pagination::CursorPager;
use crate::traits::{EntryStore, StoreProvider};
use crate::types::{Entry, EntryDetail, EntryFilter};
use crate::versioning::VersionArbiter;

/// Public entry point over an [`EntryStore`].
///
/// The backend is chosen once and owned here; the pager and the arbiter hold
/// no state besides their settings, so a `Catalog` can be shared behind an
/// `Arc` across tasks.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn EntryStore>,
    pager: CursorPager,
    arbiter: VersionArbiter,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("provider", &self.store.provider())
            .field("pager", &self.pager)
            .field("arbiter", &self.arbiter)
            .finish()
    }
}

impl Catalog {
    /// Create a catalog with default paging and lexicographic versions.
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self {
            store,
            pager: CursorPager::default(),
            arbiter: VersionArbiter::default(),
        }
    }

    /// Create a catalog using the engine settings from `config`.
    pub fn from_config(config: &CatalogConfig, store: Arc<dyn EntryStore>) -> Self {
        Self {
            store,
            pager: CursorPager::new(config.default_page_size),
            arbiter: VersionArbiter::new(Arc::from(config.version_ordering.comparator())),
        }
    }

    /// Replace the version arbiter.
    pub fn with_arbiter(mut self, arbiter: VersionArbiter) -> Self {
        self.arbiter = arbiter;
        self
    }

    /// Replace the pager.
    pub fn with_pager(mut self, pager: CursorPager) -> Self {
        self.pager = pager;
        self
    }

    /// List latest entries, ascending by id.
    ///
    /// Returns the page and the cursor for the next one, empty when there
    /// are no further entries. `limit <= 0` selects the default page size.
    pub async fn list(
        &self,
        ctx: &OpContext,
        filter: &HashMap<String, String>,
        cursor: &str,
        limit: i64,
    ) -> CatalogResult<(Vec<Entry>, String)> {
        let filter = EntryFilter::from_map(filter)?;
        let page = self
            .pager
            .page(self.store.as_ref(), ctx, &filter, cursor, limit)
            .await?;
        Ok((page.entries, page.next_cursor))
    }

    /// Fetch one entry by id, with packages and remotes.
    pub async fn get_by_id(&self, ctx: &OpContext, id: &str) -> CatalogResult<EntryDetail> {
        self.store
            .get(ctx, id)
            .await?
            .ok_or_else(|| CatalogError::not_found(id))
    }

    /// Publish a new version of an entry.
    ///
    /// The returned entry carries the assigned id, release date and latest
    /// flag. Fails with `InvalidVersion` unless the version is strictly
    /// greater than the current latest for the same name.
    pub async fn publish(&self, ctx: &OpContext, entry: EntryDetail) -> CatalogResult<EntryDetail> {
        let candidate = self.arbiter.prepare(entry)?;
        let stored = self
            .store
            .promote(ctx, candidate, &self.arbiter)
            .await?;

        tracing::info!(
            id = %stored.id(),
            name = %stored.name(),
            version = %stored.version(),
            "published entry"
        );
        Ok(stored)
    }

    /// Import seed data from a JSON or JSON Lines file.
    pub async fn import_seed(&self, ctx: &OpContext, path: &Path) -> CatalogResult<SeedReport> {
        SeedImporter
            .import_file(self.store.as_ref(), ctx, path)
            .await
    }

    /// Release backend resources. Safe to call more than once.
    pub async fn close(&self) -> CatalogResult<()> {
        self.store.close().await
    }

    /// Name of the version ordering used to gate publishes.
    pub fn version_ordering(&self) -> &'static str {
        self.arbiter.comparator().name()
    }

    /// Which backend serves this catalog.
    pub fn provider(&self) -> StoreProvider {
        self.store.provider()
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }
}
