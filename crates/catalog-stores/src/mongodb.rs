//! Document entry store on MongoDB.
//!
//! One document per entry, keyed by `_id = id`. Publishing and seeding run in
//! multi-document transactions, which need a replica set or sharded cluster.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mongodb::{
    bson::{self, doc, Document},
    error::{
        ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT,
    },
    options::{ClientOptions, FindOneOptions, FindOptions, IndexOptions, ReplaceOptions},
    Client, ClientSession, Collection, IndexModel,
};

use catalog_core::context::OpContext;
use catalog_core::error::{CatalogError, CatalogResult, ErrorCode};
use catalog_core::traits::{EntryStore, SeedWriteStats, StoreConfig, StoreProvider};
use catalog_core::types::{Entry, EntryDetail, EntryFilter};
use catalog_core::versioning::VersionArbiter;

const DUPLICATE_KEY: i32 = 11000;
const WRITE_CONFLICT: i32 = 112;
/// Attempts per transaction before a lost race surfaces as `Conflict`.
const MAX_TRANSACTION_ATTEMPTS: usize = 10;

/// MongoDB-backed entry store.
pub struct MongoEntryStore {
    client: Client,
    collection: Collection<Document>,
    closed: AtomicBool,
}

impl std::fmt::Debug for MongoEntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoEntryStore")
            .field("collection", &self.collection.name())
            .finish_non_exhaustive()
    }
}

impl MongoEntryStore {
    /// Connect, ping the server and create indexes.
    pub async fn connect(config: &StoreConfig) -> CatalogResult<Self> {
        let url = config.url.clone().ok_or_else(|| {
            CatalogError::Configuration("MongoDB connection string required".to_string())
        })?;
        let database = config
            .database
            .clone()
            .unwrap_or_else(|| "catalog".to_string());
        let timeout = Duration::from_secs(config.connect_timeout_secs);

        let mut options = ClientOptions::parse(&url)
            .await
            .map_err(|e| CatalogError::Configuration(format!("Failed to parse MongoDB URL: {}", e)))?;
        options.app_name = Some("catalog".to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options).map_err(connection_err)?;
        let db = client.database(&database);
        db.run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(connection_err)?;

        let store = Self {
            collection: db.collection(&config.collection_name),
            client,
            closed: AtomicBool::new(false),
        };
        store.ensure_indexes().await?;

        tracing::info!(
            database = %database,
            collection = %config.collection_name,
            "mongodb entry store connected"
        );
        Ok(store)
    }

    async fn ensure_indexes(&self) -> CatalogResult<()> {
        let name_version = IndexModel::builder()
            .keys(doc! { "name": 1, "version_detail.version": 1 })
            .options(
                IndexOptions::builder()
                    .name("name_version".to_string())
                    .build(),
            )
            .build();
        let latest_per_name = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(
                IndexOptions::builder()
                    .name("latest_per_name".to_string())
                    .unique(true)
                    .partial_filter_expression(doc! { "version_detail.is_latest": true })
                    .build(),
            )
            .build();

        self.collection
            .create_indexes(vec![name_version, latest_per_name], None)
            .await
            .map_err(mongo_err)?;
        Ok(())
    }

    fn ensure_open(&self) -> CatalogResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CatalogError::closed());
        }
        Ok(())
    }
}

/// Serialize an entry with its id stored as `_id`.
fn to_document(detail: &EntryDetail) -> CatalogResult<Document> {
    let mut document = bson::to_document(detail)
        .map_err(|e| CatalogError::Internal(format!("Failed to serialize entry: {}", e)))?;
    document.remove("id");
    document.insert("_id", detail.id());
    Ok(document)
}

fn from_document(mut document: Document) -> CatalogResult<EntryDetail> {
    if let Some(id) = document.remove("_id") {
        document.insert("id", id);
    }
    bson::from_document(document)
        .map_err(|e| CatalogError::database(format!("Failed to deserialize entry: {}", e)))
}

fn connection_err(e: mongodb::error::Error) -> CatalogError {
    CatalogError::Connection {
        message: e.to_string(),
        code: ErrorCode::DbConnectionFailed,
        source: Some(Box::new(e)),
    }
}

fn mongo_err(e: mongodb::error::Error) -> CatalogError {
    match e.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => connection_err(e),
        _ => CatalogError::Database {
            message: e.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(e)),
        },
    }
}

/// Errors the server marks as safe to retry by re-running the transaction.
fn is_transient(e: &mongodb::error::Error) -> bool {
    e.contains_label(TRANSIENT_TRANSACTION_ERROR)
        || matches!(e.kind.as_ref(), ErrorKind::Command(command) if command.code == WRITE_CONFLICT)
}

/// Map a failure inside a write transaction.
///
/// A duplicate `_id` is an id collision. A duplicate on the latest-per-name
/// index or a transient transaction error means a concurrent writer won; the
/// caller re-runs the transaction on `Conflict`.
fn txn_err(e: mongodb::error::Error, id: &str) -> CatalogError {
    let lost_race = || {
        CatalogError::conflict(format!(
            "concurrent write for the same name while writing {}",
            id
        ))
    };

    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
            if write.message.contains("_id_") {
                CatalogError::already_exists(id)
            } else {
                lost_race()
            }
        }
        _ if is_transient(&e) => lost_race(),
        _ => mongo_err(e),
    }
}

/// Commit an open transaction.
///
/// Runs outside `OpContext::run` so a commit is never dropped half-sent. A
/// commit with an unknown outcome is retried as is; re-running the whole
/// transaction there could apply the writes twice.
async fn commit(session: &mut ClientSession) -> Result<(), mongodb::error::Error> {
    let mut attempt = 1;
    loop {
        match session.commit_transaction().await {
            Err(e)
                if attempt < MAX_TRANSACTION_ATTEMPTS
                    && e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) =>
            {
                tracing::debug!(error = %e, attempt, "retrying commit with unknown result");
                attempt += 1;
            }
            result => return result,
        }
    }
}

impl MongoEntryStore {
    /// One attempt at the publish transaction.
    async fn try_promote(
        &self,
        ctx: &OpContext,
        candidate: &EntryDetail,
        document: &Document,
        arbiter: &VersionArbiter,
    ) -> CatalogResult<()> {
        let id = candidate.id();
        let mut session = ctx
            .run(async { self.client.start_session(None).await.map_err(mongo_err) })
            .await?;

        // Dropping the session before commit aborts the transaction.
        ctx.run(async {
            session.start_transaction(None).await.map_err(mongo_err)?;

            let current = self
                .collection
                .find_one_with_session(
                    doc! { "name": candidate.name(), "version_detail.is_latest": true },
                    None,
                    &mut session,
                )
                .await
                .map_err(|e| txn_err(e, id))?
                .map(from_document)
                .transpose()?
                .map(|detail| detail.summary());

            arbiter.admit(candidate, current.as_ref())?;

            if let Some(current) = &current {
                self.collection
                    .update_one_with_session(
                        doc! { "_id": current.id.as_str() },
                        doc! { "$set": { "version_detail.is_latest": false } },
                        None,
                        &mut session,
                    )
                    .await
                    .map_err(|e| txn_err(e, id))?;
            }

            self.collection
                .insert_one_with_session(document, None, &mut session)
                .await
                .map_err(|e| txn_err(e, id))?;
            Ok(())
        })
        .await?;

        ctx.check()?;
        commit(&mut session).await.map_err(|e| txn_err(e, id))
    }

    /// One attempt at the seed transaction.
    async fn try_upsert_seed(
        &self,
        ctx: &OpContext,
        records: &[EntryDetail],
        documents: &[Document],
    ) -> CatalogResult<SeedWriteStats> {
        let replace = ReplaceOptions::builder().upsert(true).build();
        let mut session = ctx
            .run(async { self.client.start_session(None).await.map_err(mongo_err) })
            .await?;

        let stats = ctx
            .run(async {
                session.start_transaction(None).await.map_err(mongo_err)?;

                let mut stats = SeedWriteStats::default();
                for (record, document) in records.iter().zip(documents) {
                    if record.is_latest() {
                        let demoted = self
                            .collection
                            .update_many_with_session(
                                doc! {
                                    "name": record.name(),
                                    "version_detail.is_latest": true,
                                    "_id": { "$ne": record.id() },
                                },
                                doc! { "$set": { "version_detail.is_latest": false } },
                                None,
                                &mut session,
                            )
                            .await
                            .map_err(|e| txn_err(e, record.id()))?;
                        stats.demoted += demoted.modified_count;
                    }

                    let result = self
                        .collection
                        .replace_one_with_session(
                            doc! { "_id": record.id() },
                            document,
                            replace.clone(),
                            &mut session,
                        )
                        .await
                        .map_err(|e| txn_err(e, record.id()))?;
                    if result.upserted_id.is_some() {
                        stats.created += 1;
                    } else {
                        stats.updated += 1;
                    }
                }
                Ok(stats)
            })
            .await?;

        ctx.check()?;
        commit(&mut session)
            .await
            .map_err(|e| txn_err(e, "seed batch"))?;
        Ok(stats)
    }
}

#[async_trait]
impl EntryStore for MongoEntryStore {
    async fn scan_latest(
        &self,
        ctx: &OpContext,
        filter: &EntryFilter,
        after: Option<&str>,
        limit: usize,
    ) -> CatalogResult<Vec<Entry>> {
        self.ensure_open()?;

        let mut query = doc! { "version_detail.is_latest": true };
        if let Some(after) = after {
            query.insert("_id", doc! { "$gt": after });
        }
        if let Some(name) = &filter.name {
            query.insert("name", name.as_str());
        }
        if let Some(version) = &filter.version {
            query.insert("version_detail.version", version.as_str());
        }

        let options = FindOptions::builder()
            .sort(doc! { "_id": 1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .projection(doc! { "packages": 0, "remotes": 0, "package_canonical": 0 })
            .build();

        ctx.run(async {
            let mut cursor = self
                .collection
                .find(query, options)
                .await
                .map_err(mongo_err)?;

            let mut entries = Vec::new();
            while cursor.advance().await.map_err(mongo_err)? {
                let document = cursor
                    .deserialize_current()
                    .map_err(|e| CatalogError::database(format!("Cursor error: {}", e)))?;
                entries.push(from_document(document)?.summary());
            }
            Ok(entries)
        })
        .await
    }

    async fn contains(&self, ctx: &OpContext, id: &str) -> CatalogResult<bool> {
        self.ensure_open()?;
        let options = FindOneOptions::builder()
            .projection(doc! { "_id": 1 })
            .build();

        ctx.run(async {
            let found = self
                .collection
                .find_one(doc! { "_id": id }, options)
                .await
                .map_err(mongo_err)?;
            Ok(found.is_some())
        })
        .await
    }

    async fn get(&self, ctx: &OpContext, id: &str) -> CatalogResult<Option<EntryDetail>> {
        self.ensure_open()?;

        ctx.run(async {
            self.collection
                .find_one(doc! { "_id": id }, None)
                .await
                .map_err(mongo_err)?
                .map(from_document)
                .transpose()
        })
        .await
    }

    async fn promote(
        &self,
        ctx: &OpContext,
        candidate: EntryDetail,
        arbiter: &VersionArbiter,
    ) -> CatalogResult<EntryDetail> {
        self.ensure_open()?;
        let document = to_document(&candidate)?;

        let mut attempt = 1;
        loop {
            match self.try_promote(ctx, &candidate, &document, arbiter).await {
                Ok(()) => break,
                Err(CatalogError::Conflict { .. }) if attempt < MAX_TRANSACTION_ATTEMPTS => {
                    tracing::debug!(id = %candidate.id(), attempt, "publish lost a race, re-reading");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(id = %candidate.id(), "mongodb promote committed");
        Ok(candidate)
    }

    async fn upsert_seed(
        &self,
        ctx: &OpContext,
        records: Vec<EntryDetail>,
    ) -> CatalogResult<SeedWriteStats> {
        self.ensure_open()?;
        let documents = records
            .iter()
            .map(to_document)
            .collect::<CatalogResult<Vec<_>>>()?;

        let mut attempt = 1;
        loop {
            match self.try_upsert_seed(ctx, &records, &documents).await {
                Err(CatalogError::Conflict { .. }) if attempt < MAX_TRANSACTION_ATTEMPTS => {
                    tracing::debug!(attempt, "seed transaction lost a race, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn close(&self) -> CatalogResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.client.clone().shutdown().await;
            tracing::info!("mongodb entry store closed");
        }
        Ok(())
    }

    fn provider(&self) -> StoreProvider {
        StoreProvider::MongoDB
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_keys_id_as_underscore_id() {
        let detail = EntryDetail::new("fs", "1.0.0")
            .with_id("abc")
            .with_latest(true);

        let document = to_document(&detail).unwrap();
        assert_eq!(document.get_str("_id").unwrap(), "abc");
        assert!(!document.contains_key("id"));
        assert!(document
            .get_document("version_detail")
            .unwrap()
            .get_bool("is_latest")
            .unwrap());

        assert_eq!(from_document(document).unwrap(), detail);
    }
}
