//! Bulk seed import.
//!
//! Records are validated one by one; invalid records are skipped and the
//! batch continues. Everything that passes validation is written in a single
//! atomic batch with upsert semantics and no version gating.

use std::path::Path;

use tokio::io::BufReader;

use crate::context::OpContext;
use crate::error::{CatalogError, CatalogResult, ErrorCode};
use crate::import::jsonl::read_jsonl;
use crate::pagination::CursorPager;
use crate::traits::EntryStore;
use crate::types::{now_rfc3339, EntryDetail, SEED_VERSION};

/// Statistics from a seed import.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    /// Records read from the file.
    pub total: u64,
    /// Records inserted under a new id.
    pub created: u64,
    /// Records that overwrote an existing id.
    pub updated: u64,
    /// Records skipped by validation.
    pub skipped: u64,
    /// Existing entries demoted by a latest seed record of the same name.
    pub demoted: u64,
    /// One message per skipped record.
    pub errors: Vec<String>,
}

impl SeedReport {
    /// Records actually written.
    pub fn imported(&self) -> u64 {
        self.created + self.updated
    }

    /// Whether every record was imported.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate one raw seed record.
///
/// Requires a non-empty `id` usable as a cursor and a non-empty `name`. A
/// record without a version gets [`SEED_VERSION`] and is marked latest.
pub fn validate_seed_record(raw: serde_json::Value) -> CatalogResult<EntryDetail> {
    let mut record: EntryDetail = serde_json::from_value(raw).map_err(|e| {
        CatalogError::validation_with_code(
            format!("malformed record: {}", e),
            ErrorCode::ValInvalidRecord,
        )
    })?;

    if record.id().trim().is_empty() {
        return Err(CatalogError::missing_field("id"));
    }
    CursorPager::parse_cursor(record.id()).map_err(|_| {
        CatalogError::validation_with_code(
            format!("id '{}' is not a valid identifier", record.id()),
            ErrorCode::ValInvalidRecord,
        )
    })?;
    if record.name().trim().is_empty() {
        return Err(CatalogError::missing_field("name"));
    }

    if record.version().is_empty() {
        let detail = &mut record.entry.version_detail;
        detail.version = SEED_VERSION.to_string();
        detail.release_date = now_rfc3339();
        detail.is_latest = true;
    }

    Ok(record)
}

/// Drives seed imports against an [`EntryStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedImporter;

impl SeedImporter {
    /// Import a seed file.
    ///
    /// `.jsonl` files are read as JSON Lines; anything else must hold a JSON
    /// array of records.
    pub async fn import_file(
        &self,
        store: &dyn EntryStore,
        ctx: &OpContext,
        path: &Path,
    ) -> CatalogResult<SeedReport> {
        ctx.check()?;

        let records = if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
            let file = tokio::fs::File::open(path).await?;
            read_jsonl(BufReader::new(file)).await?
        } else {
            let content = tokio::fs::read_to_string(path).await?;
            let value: serde_json::Value = serde_json::from_str(&content)
                .map_err(|e| CatalogError::parse(format!("seed file is not valid JSON: {}", e)))?;
            match value {
                serde_json::Value::Array(items) => items.into_iter().map(Ok).collect(),
                _ => {
                    return Err(CatalogError::parse(
                        "seed file must contain a JSON array of entries",
                    ))
                }
            }
        };

        tracing::info!(path = %path.display(), records = records.len(), "importing seed file");
        self.import_records(store, ctx, records).await
    }

    /// Validate and write already-parsed records.
    pub async fn import_records(
        &self,
        store: &dyn EntryStore,
        ctx: &OpContext,
        records: Vec<CatalogResult<serde_json::Value>>,
    ) -> CatalogResult<SeedReport> {
        let mut report = SeedReport {
            total: records.len() as u64,
            ..SeedReport::default()
        };

        let mut valid = Vec::with_capacity(records.len());
        for (index, raw) in records.into_iter().enumerate() {
            match raw.and_then(validate_seed_record) {
                Ok(record) => valid.push(record),
                Err(e) => {
                    tracing::warn!(record = index + 1, error = %e, "skipping seed record");
                    report.skipped += 1;
                    report.errors.push(format!("record {}: {}", index + 1, e));
                }
            }
        }

        if !valid.is_empty() {
            let stats = store.upsert_seed(ctx, valid).await?;
            report.created = stats.created;
            report.updated = stats.updated;
            report.demoted = stats.demoted;
        }

        tracing::info!(
            total = report.total,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            "seed import completed"
        );
        Ok(report)
    }
}
