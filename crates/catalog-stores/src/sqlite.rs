//! Relational entry store on SQLite.
//!
//! One row per entry in the `servers` table. Packages and remotes are stored
//! as JSON text. A partial unique index on `name` where the latest flag is
//! set backs the single-latest rule at the storage level.
//!
//! # Example
//!
//! ```ignore
//! use catalog_stores::SqliteEntryStore;
//!
//! let store = SqliteEntryStore::open("catalog.db")?;
//! let store = SqliteEntryStore::in_memory()?;
//! ```

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode as SqliteCode, OptionalExtension, TransactionBehavior};

use catalog_core::context::OpContext;
use catalog_core::error::{CatalogError, CatalogResult};
use catalog_core::traits::{EntryStore, SeedWriteStats, StoreConfig, StoreProvider};
use catalog_core::types::{Entry, EntryDetail, EntryFilter, Repository, VersionDetail};
use catalog_core::versioning::VersionArbiter;

const SUMMARY_COLUMNS: &str = "id, name, description, repository_url, repository_source, \
     repository_id, version_detail_version, version_detail_release_date, version_detail_is_latest";

const DETAIL_COLUMNS: &str = "id, name, description, repository_url, repository_source, \
     repository_id, version_detail_version, version_detail_release_date, version_detail_is_latest, \
     package_canonical, packages, remotes";

/// SQLite-backed entry store.
///
/// The connection sits behind a `Mutex`, so all statements are serialized.
/// `None` means the store was closed.
pub struct SqliteEntryStore {
    conn: Mutex<Option<Connection>>,
}

impl std::fmt::Debug for SqliteEntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEntryStore").finish_non_exhaustive()
    }
}

impl SqliteEntryStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| CatalogError::Connection {
            message: format!("failed to open {}: {}", path.as_ref().display(), e),
            code: catalog_core::ErrorCode::DbConnectionFailed,
            source: Some(Box::new(e)),
        })?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> CatalogResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn)
    }

    /// Open the store described by `config`; no path means in-memory.
    pub fn from_config(config: &StoreConfig) -> CatalogResult<Self> {
        let store = match &config.path {
            Some(path) if path.as_os_str() != ":memory:" => Self::open(path)?,
            _ => Self::in_memory()?,
        };
        if let Ok(guard) = store.conn.lock() {
            if let Some(conn) = guard.as_ref() {
                conn.busy_timeout(Duration::from_secs(config.connect_timeout_secs))
                    .map_err(db_err)?;
            }
        }
        Ok(store)
    }

    fn with_connection(conn: Connection) -> CatalogResult<Self> {
        init_schema(&conn)?;
        tracing::info!("sqlite entry store opened");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn lock(&self) -> CatalogResult<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|e| CatalogError::Internal(format!("sqlite connection lock poisoned: {}", e)))
    }
}

fn init_schema(conn: &Connection) -> CatalogResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS servers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            repository_url TEXT NOT NULL DEFAULT '',
            repository_source TEXT NOT NULL DEFAULT '',
            repository_id TEXT NOT NULL DEFAULT '',
            version_detail_version TEXT NOT NULL,
            version_detail_release_date TEXT NOT NULL DEFAULT '',
            version_detail_is_latest INTEGER NOT NULL DEFAULT 0,
            package_canonical TEXT NOT NULL DEFAULT '',
            packages TEXT NOT NULL DEFAULT '[]',
            remotes TEXT NOT NULL DEFAULT '[]'
        );

        CREATE INDEX IF NOT EXISTS idx_servers_name_version
            ON servers(name, version_detail_version);

        -- At most one latest row per name
        CREATE UNIQUE INDEX IF NOT EXISTS idx_servers_latest_name
            ON servers(name) WHERE version_detail_is_latest = 1;
    "#,
    )
    .map_err(db_err)
}

fn db_err(e: rusqlite::Error) -> CatalogError {
    CatalogError::Database {
        message: e.to_string(),
        code: catalog_core::ErrorCode::DbOperationFailed,
        source: Some(Box::new(e)),
    }
}

/// Map an insert failure, telling id collisions apart from a second latest row.
fn insert_err(e: rusqlite::Error, id: &str) -> CatalogError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &e {
        if failure.code == SqliteCode::ConstraintViolation {
            if message.contains("servers.id") {
                return CatalogError::already_exists(id);
            }
            if message.contains("servers.name") {
                return CatalogError::conflict(format!(
                    "another latest entry was written while publishing {}",
                    id
                ));
            }
        }
    }
    db_err(e)
}

fn summary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        repository: Repository {
            url: row.get(3)?,
            source: row.get(4)?,
            id: row.get(5)?,
        },
        version_detail: VersionDetail {
            version: row.get(6)?,
            release_date: row.get(7)?,
            is_latest: row.get(8)?,
        },
    })
}

/// A detail row before its JSON columns are decoded.
struct DetailRow {
    entry: Entry,
    package_canonical: String,
    packages: String,
    remotes: String,
}

impl DetailRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            entry: summary_from_row(row)?,
            package_canonical: row.get(9)?,
            packages: row.get(10)?,
            remotes: row.get(11)?,
        })
    }

    fn decode(self) -> CatalogResult<EntryDetail> {
        Ok(EntryDetail {
            entry: self.entry,
            package_canonical: self.package_canonical,
            packages: serde_json::from_str(&self.packages)?,
            remotes: serde_json::from_str(&self.remotes)?,
        })
    }
}

fn latest_by_name(conn: &Connection, name: &str) -> CatalogResult<Option<Entry>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM servers WHERE name = ?1 AND version_detail_is_latest = 1",
            SUMMARY_COLUMNS
        ),
        params![name],
        summary_from_row,
    )
    .optional()
    .map_err(db_err)
}

fn id_exists(conn: &Connection, id: &str) -> CatalogResult<bool> {
    conn.query_row("SELECT 1 FROM servers WHERE id = ?1", params![id], |_| Ok(()))
        .optional()
        .map(|found| found.is_some())
        .map_err(db_err)
}

fn write_row(conn: &Connection, sql: &str, detail: &EntryDetail) -> Result<usize, rusqlite::Error> {
    let packages = serde_json::to_string(&detail.packages)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let remotes = serde_json::to_string(&detail.remotes)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let entry = &detail.entry;

    conn.execute(
        sql,
        params![
            entry.id,
            entry.name,
            entry.description,
            entry.repository.url,
            entry.repository.source,
            entry.repository.id,
            entry.version_detail.version,
            entry.version_detail.release_date,
            entry.version_detail.is_latest,
            detail.package_canonical,
            packages,
            remotes,
        ],
    )
}

const INSERT_SQL: &str = "INSERT INTO servers (id, name, description, repository_url, \
     repository_source, repository_id, version_detail_version, version_detail_release_date, \
     version_detail_is_latest, package_canonical, packages, remotes) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

const UPSERT_SQL: &str = "INSERT INTO servers (id, name, description, repository_url, \
     repository_source, repository_id, version_detail_version, version_detail_release_date, \
     version_detail_is_latest, package_canonical, packages, remotes) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
     ON CONFLICT(id) DO UPDATE SET \
         name = excluded.name, \
         description = excluded.description, \
         repository_url = excluded.repository_url, \
         repository_source = excluded.repository_source, \
         repository_id = excluded.repository_id, \
         version_detail_version = excluded.version_detail_version, \
         version_detail_release_date = excluded.version_detail_release_date, \
         version_detail_is_latest = excluded.version_detail_is_latest, \
         package_canonical = excluded.package_canonical, \
         packages = excluded.packages, \
         remotes = excluded.remotes";

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn scan_latest(
        &self,
        ctx: &OpContext,
        filter: &EntryFilter,
        after: Option<&str>,
        limit: usize,
    ) -> CatalogResult<Vec<Entry>> {
        ctx.check()?;
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(CatalogError::closed)?;

        let sql = format!(
            "SELECT {} FROM servers \
             WHERE version_detail_is_latest = 1 \
               AND (?1 IS NULL OR id > ?1) \
               AND (?2 IS NULL OR name = ?2) \
               AND (?3 IS NULL OR version_detail_version = ?3) \
             ORDER BY id ASC LIMIT ?4",
            SUMMARY_COLUMNS
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(
                params![after, filter.name.as_deref(), filter.version.as_deref(), limit],
                summary_from_row,
            )
            .map_err(db_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    async fn contains(&self, ctx: &OpContext, id: &str) -> CatalogResult<bool> {
        ctx.check()?;
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(CatalogError::closed)?;
        id_exists(conn, id)
    }

    async fn get(&self, ctx: &OpContext, id: &str) -> CatalogResult<Option<EntryDetail>> {
        ctx.check()?;
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or_else(CatalogError::closed)?;

        let row = conn
            .query_row(
                &format!("SELECT {} FROM servers WHERE id = ?1", DETAIL_COLUMNS),
                params![id],
                DetailRow::from_row,
            )
            .optional()
            .map_err(db_err)?;

        row.map(DetailRow::decode).transpose()
    }

    async fn promote(
        &self,
        ctx: &OpContext,
        candidate: EntryDetail,
        arbiter: &VersionArbiter,
    ) -> CatalogResult<EntryDetail> {
        ctx.check()?;
        let mut guard = self.lock()?;
        let conn = guard.as_mut().ok_or_else(CatalogError::closed)?;

        // Rolled back on drop unless committed.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let current = latest_by_name(&tx, candidate.name())?;
        arbiter.admit(&candidate, current.as_ref())?;

        if id_exists(&tx, candidate.id())? {
            return Err(CatalogError::already_exists(candidate.id()));
        }

        if let Some(current) = &current {
            tx.execute(
                "UPDATE servers SET version_detail_is_latest = 0 WHERE id = ?1",
                params![current.id],
            )
            .map_err(db_err)?;
        }
        write_row(&tx, INSERT_SQL, &candidate).map_err(|e| insert_err(e, candidate.id()))?;

        ctx.check()?;
        tx.commit().map_err(db_err)?;

        tracing::debug!(
            id = %candidate.id(),
            demoted = current.as_ref().map(|c| c.id.as_str()).unwrap_or(""),
            "sqlite promote committed"
        );
        Ok(candidate)
    }

    async fn upsert_seed(
        &self,
        ctx: &OpContext,
        records: Vec<EntryDetail>,
    ) -> CatalogResult<SeedWriteStats> {
        ctx.check()?;
        let mut guard = self.lock()?;
        let conn = guard.as_mut().ok_or_else(CatalogError::closed)?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let mut stats = SeedWriteStats::default();
        for record in &records {
            if record.is_latest() {
                let demoted = tx
                    .execute(
                        "UPDATE servers SET version_detail_is_latest = 0 \
                         WHERE name = ?1 AND version_detail_is_latest = 1 AND id <> ?2",
                        params![record.name(), record.id()],
                    )
                    .map_err(db_err)?;
                stats.demoted += demoted as u64;
            }

            if id_exists(&tx, record.id())? {
                stats.updated += 1;
            } else {
                stats.created += 1;
            }
            write_row(&tx, UPSERT_SQL, record).map_err(db_err)?;
        }

        ctx.check()?;
        tx.commit().map_err(db_err)?;
        Ok(stats)
    }

    async fn close(&self) -> CatalogResult<()> {
        let conn = self.lock()?.take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| db_err(e))?;
            tracing::info!("sqlite entry store closed");
        }
        Ok(())
    }

    fn provider(&self) -> StoreProvider {
        StoreProvider::Sqlite
    }
}
