//! Entry store trait and related types.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::OpContext;
use crate::error::CatalogResult;
use crate::types::{Entry, EntryDetail, EntryFilter};
use crate::versioning::VersionArbiter;

/// Outcome of a seed batch write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedWriteStats {
    /// Records inserted because their id was new.
    pub created: u64,
    /// Records that overwrote an existing id.
    pub updated: u64,
    /// Other entries demoted because a seed record of the same name was latest.
    pub demoted: u64,
}

/// Core EntryStore trait - all catalog backends implement this.
///
/// Implementations own the durable representation. They never decide on
/// version ordering themselves: `promote` hands that to the arbiter from
/// inside the backend's atomic unit.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Latest entries matching `filter` with an id strictly greater than
    /// `after`, ascending by id, at most `limit` of them.
    async fn scan_latest(
        &self,
        ctx: &OpContext,
        filter: &EntryFilter,
        after: Option<&str>,
        limit: usize,
    ) -> CatalogResult<Vec<Entry>>;

    /// Whether an entry with this id exists (latest or not).
    async fn contains(&self, ctx: &OpContext, id: &str) -> CatalogResult<bool>;

    /// Fetch an entry by id.
    async fn get(&self, ctx: &OpContext, id: &str) -> CatalogResult<Option<EntryDetail>>;

    /// Atomically look up the current latest entry for `candidate.name`,
    /// run `arbiter.admit`, demote the previous latest and insert `candidate`.
    ///
    /// `candidate` has already been stamped by [`VersionArbiter::prepare`].
    async fn promote(
        &self,
        ctx: &OpContext,
        candidate: EntryDetail,
        arbiter: &VersionArbiter,
    ) -> CatalogResult<EntryDetail>;

    /// Upsert validated seed records by id in one atomic batch.
    ///
    /// A record marked latest demotes any other latest entry with the same name.
    async fn upsert_seed(
        &self,
        ctx: &OpContext,
        records: Vec<EntryDetail>,
    ) -> CatalogResult<SeedWriteStats>;

    /// Release backend resources. Idempotent.
    async fn close(&self) -> CatalogResult<()>;

    /// Which backend this is.
    fn provider(&self) -> StoreProvider;
}

/// Store provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    /// In-process map, for tests and local development.
    #[default]
    Memory,
    /// Relational store backed by SQLite.
    Sqlite,
    /// Document store backed by MongoDB.
    MongoDB,
}

impl StoreProvider {
    /// Parse from a config string.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "sqlite" | "sql" | "relational" => Some(Self::Sqlite),
            "mongodb" | "mongo" | "document" => Some(Self::MongoDB),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
            Self::MongoDB => "mongodb",
        }
    }
}

impl fmt::Display for StoreProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Provider type.
    pub provider: StoreProvider,
    /// Connection string (MongoDB).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Database name (MongoDB).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Collection or table name.
    pub collection_name: String,
    /// Database file (SQLite); `None` opens an in-memory database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: StoreProvider::Memory,
            url: None,
            database: None,
            collection_name: "servers".to_string(),
            path: None,
            connect_timeout_secs: 10,
        }
    }
}
