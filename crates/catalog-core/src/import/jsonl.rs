//! JSON Lines reader for seed files.
//!
//! Reads line by line without loading the whole file. Lines that are not
//! valid JSON are reported per line and do not abort the read.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{CatalogError, CatalogResult, ErrorCode};

/// Read raw JSON records from a JSON Lines source.
///
/// Blank lines are ignored. Each returned item is either the parsed value or
/// a validation error naming the offending line.
pub async fn read_jsonl<R>(reader: R) -> CatalogResult<Vec<CatalogResult<serde_json::Value>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut records = Vec::new();
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        records.push(serde_json::from_str(line).map_err(|e| {
            CatalogError::validation_with_code(
                format!("parse error at line {}: {}", line_no, e),
                ErrorCode::ValInvalidRecord,
            )
        }));
    }

    Ok(records)
}
