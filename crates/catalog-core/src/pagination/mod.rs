//! Cursor pagination over the identifier-ordered key space.
//!
//! A cursor is the id of the last entry of the previous page. The pager asks
//! the backend for one row more than requested; if that extra row exists the
//! page is full and the id of its last returned entry becomes the next cursor.
//! No snapshot is held between pages.

use crate::context::OpContext;
use crate::error::{CatalogError, CatalogResult, ErrorCode};
use crate::traits::EntryStore;
use crate::types::{Entry, EntryFilter};

/// Page size used when the caller passes `limit <= 0`.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Longest accepted cursor token, in bytes.
pub const MAX_CURSOR_LEN: usize = 256;

/// One page of `list` results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<Entry>,
    /// Empty iff there are no entries beyond this page.
    pub next_cursor: String,
}

impl Page {
    pub fn has_more(&self) -> bool {
        !self.next_cursor.is_empty()
    }
}

/// Stateless pager wrapping [`EntryStore::scan_latest`].
#[derive(Debug, Clone, Copy)]
pub struct CursorPager {
    default_limit: usize,
}

impl Default for CursorPager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl CursorPager {
    /// Create a pager; a zero default falls back to [`DEFAULT_PAGE_SIZE`].
    pub fn new(default_limit: usize) -> Self {
        let default_limit = if default_limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            default_limit
        };
        Self { default_limit }
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Map a caller-supplied limit to a page size.
    pub fn normalize_limit(&self, limit: i64) -> usize {
        if limit <= 0 {
            self.default_limit
        } else {
            usize::try_from(limit).unwrap_or(usize::MAX)
        }
    }

    /// Check cursor syntax. An empty token means "from the start".
    pub fn parse_cursor(token: &str) -> CatalogResult<Option<&str>> {
        if token.is_empty() {
            return Ok(None);
        }
        if token.len() > MAX_CURSOR_LEN
            || token.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(CatalogError::validation_with_suggestion(
                "malformed pagination cursor",
                ErrorCode::ValInvalidCursor,
                "Pass the next_cursor value from a previous page unchanged",
            ));
        }
        Ok(Some(token))
    }

    /// Fetch one page.
    pub async fn page(
        &self,
        store: &dyn EntryStore,
        ctx: &OpContext,
        filter: &EntryFilter,
        cursor: &str,
        limit: i64,
    ) -> CatalogResult<Page> {
        let limit = self.normalize_limit(limit);
        let after = Self::parse_cursor(cursor)?;

        if let Some(id) = after {
            if !store.contains(ctx, id).await? {
                return Err(CatalogError::cursor_not_found(id));
            }
        }

        let mut entries = store
            .scan_latest(ctx, filter, after, limit.saturating_add(1))
            .await?;

        let next_cursor = if entries.len() > limit {
            entries.truncate(limit);
            entries.last().map(|e| e.id.clone()).unwrap_or_default()
        } else {
            String::new()
        };

        tracing::debug!(
            returned = entries.len(),
            has_more = !next_cursor.is_empty(),
            "listed page"
        );

        Ok(Page {
            entries,
            next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_limit() {
        let pager = CursorPager::default();
        assert_eq!(pager.normalize_limit(0), DEFAULT_PAGE_SIZE);
        assert_eq!(pager.normalize_limit(-5), DEFAULT_PAGE_SIZE);
        assert_eq!(pager.normalize_limit(3), 3);
        assert_eq!(CursorPager::new(0).default_limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(CursorPager::new(25).normalize_limit(0), 25);
    }

    #[test]
    fn test_parse_cursor() {
        assert_eq!(CursorPager::parse_cursor("").unwrap(), None);
        assert_eq!(
            CursorPager::parse_cursor("not-a-real-id").unwrap(),
            Some("not-a-real-id")
        );

        let err = CursorPager::parse_cursor("has space").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValInvalidCursor);

        let long = "x".repeat(MAX_CURSOR_LEN + 1);
        assert!(CursorPager::parse_cursor(&long).is_err());
    }
}
