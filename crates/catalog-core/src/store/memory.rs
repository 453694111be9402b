//! In-process entry store.
//!
//! A single map from id to entry behind one `RwLock`. Name lookups are a
//! scan. Publishing holds the write lock across lookup, gate and write, which
//! serializes same-name publishes.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::context::OpContext;
use crate::error::{CatalogError, CatalogResult};
use crate::traits::{EntryStore, SeedWriteStats, StoreProvider};
use crate::types::{Entry, EntryDetail, EntryFilter};
use crate::versioning::VersionArbiter;

/// Memory-backed entry store, ordered by id.
#[derive(Debug, Default)]
pub struct InMemoryEntryStore {
    entries: RwLock<BTreeMap<String, EntryDetail>>,
    closed: AtomicBool,
}

impl InMemoryEntryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries, keyed by their ids.
    pub fn with_entries(entries: impl IntoIterator<Item = EntryDetail>) -> Self {
        let map = entries
            .into_iter()
            .map(|e| (e.entry.id.clone(), e))
            .collect();
        Self {
            entries: RwLock::new(map),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of stored entries, latest or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn ensure_open(&self) -> CatalogResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CatalogError::closed());
        }
        Ok(())
    }

    fn current_latest<'a>(
        entries: &'a BTreeMap<String, EntryDetail>,
        name: &str,
    ) -> Option<&'a EntryDetail> {
        entries
            .values()
            .find(|e| e.is_latest() && e.name() == name)
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn scan_latest(
        &self,
        ctx: &OpContext,
        filter: &EntryFilter,
        after: Option<&str>,
        limit: usize,
    ) -> CatalogResult<Vec<Entry>> {
        ctx.check()?;
        self.ensure_open()?;

        let entries = self.entries.read().await;
        let lower = match after {
            Some(id) => Bound::Excluded(id.to_string()),
            None => Bound::Unbounded,
        };

        Ok(entries
            .range((lower, Bound::Unbounded))
            .map(|(_, detail)| detail)
            .filter(|d| d.is_latest() && filter.matches(d.name(), d.version()))
            .take(limit)
            .map(EntryDetail::summary)
            .collect())
    }

    async fn contains(&self, ctx: &OpContext, id: &str) -> CatalogResult<bool> {
        ctx.check()?;
        self.ensure_open()?;
        Ok(self.entries.read().await.contains_key(id))
    }

    async fn get(&self, ctx: &OpContext, id: &str) -> CatalogResult<Option<EntryDetail>> {
        ctx.check()?;
        self.ensure_open()?;
        Ok(self.entries.read().await.get(id).cloned())
    }

    async fn promote(
        &self,
        ctx: &OpContext,
        candidate: EntryDetail,
        arbiter: &VersionArbiter,
    ) -> CatalogResult<EntryDetail> {
        ctx.check()?;
        self.ensure_open()?;

        let mut entries = self.entries.write().await;

        let previous = Self::current_latest(&entries, candidate.name()).map(|d| d.summary());
        arbiter.admit(&candidate, previous.as_ref())?;

        if entries.contains_key(candidate.id()) {
            return Err(CatalogError::already_exists(candidate.id()));
        }

        ctx.check()?;
        if let Some(previous) = previous {
            if let Some(old) = entries.get_mut(&previous.id) {
                old.entry.version_detail.is_latest = false;
            }
        }
        entries.insert(candidate.id().to_string(), candidate.clone());

        Ok(candidate)
    }

    async fn upsert_seed(
        &self,
        ctx: &OpContext,
        records: Vec<EntryDetail>,
    ) -> CatalogResult<SeedWriteStats> {
        ctx.check()?;
        self.ensure_open()?;

        let mut entries = self.entries.write().await;
        ctx.check()?;

        let mut stats = SeedWriteStats::default();
        for record in records {
            if record.is_latest() {
                for other in entries.values_mut() {
                    if other.is_latest() && other.name() == record.name() && other.id() != record.id()
                    {
                        other.entry.version_detail.is_latest = false;
                        stats.demoted += 1;
                    }
                }
            }

            match entries.insert(record.id().to_string(), record) {
                Some(_) => stats.updated += 1,
                None => stats.created += 1,
            }
        }

        Ok(stats)
    }

    async fn close(&self) -> CatalogResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.entries.write().await.clear();
            tracing::info!("memory store closed");
        }
        Ok(())
    }

    fn provider(&self) -> StoreProvider {
        StoreProvider::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn seeded(id: &str, name: &str, version: &str, latest: bool) -> EntryDetail {
        EntryDetail::new(name, version).with_id(id).with_latest(latest)
    }

    #[tokio::test]
    async fn test_scan_skips_non_latest_and_respects_after() {
        let store = InMemoryEntryStore::with_entries(vec![
            seeded("a", "one", "1.0.0", false),
            seeded("b", "one", "1.1.0", true),
            seeded("c", "two", "1.0.0", true),
        ]);
        let ctx = OpContext::background();

        let all = store
            .scan_latest(&ctx, &EntryFilter::default(), None, 10)
            .await
            .unwrap();
        assert_eq!(all.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), ["b", "c"]);

        let after_b = store
            .scan_latest(&ctx, &EntryFilter::default(), Some("b"), 10)
            .await
            .unwrap();
        assert_eq!(after_b.len(), 1);
        assert_eq!(after_b[0].id, "c");
    }

    #[tokio::test]
    async fn test_promote_rejects_duplicate_id() {
        let store = InMemoryEntryStore::with_entries(vec![seeded("dup", "one", "1.0.0", true)]);
        let candidate = seeded("dup", "other", "1.0.0", true);

        let err = store
            .promote(&OpContext::background(), candidate, &VersionArbiter::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::EntDuplicateId);
    }

    #[tokio::test]
    async fn test_promote_cancelled_writes_nothing() {
        let store = InMemoryEntryStore::new();
        let ctx = OpContext::background();
        ctx.cancel();

        let err = store
            .promote(&ctx, seeded("x", "one", "1.0.0", true), &VersionArbiter::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CtxCancelled);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let store = InMemoryEntryStore::with_entries(vec![seeded("a", "one", "1.0.0", true)]);
        store.close().await.unwrap();
        store.close().await.unwrap();

        let err = store
            .get(&OpContext::background(), "a")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DbClosed);
    }
}
