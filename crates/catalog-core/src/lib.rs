//! catalog-core - Core library for catalog.
//!
//! This crate provides the entry model, the [`EntryStore`] backend contract,
//! the version arbiter, the cursor pager and the [`Catalog`] facade that ties
//! them together over one backend.
//!
//! # Example
//!
//! ```ignore
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use catalog_core::{Catalog, EntryDetail, InMemoryEntryStore, OpContext};
//!
//! let catalog = Catalog::new(Arc::new(InMemoryEntryStore::new()));
//! let ctx = OpContext::background();
//!
//! // Publish a version
//! let stored = catalog.publish(&ctx, EntryDetail::new("io.github.acme/fs", "1.0.0")).await?;
//!
//! // List latest entries
//! let (entries, next_cursor) = catalog.list(&ctx, &HashMap::new(), "", 10).await?;
//! ```

mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod import;
pub mod pagination;
pub mod store;
pub mod traits;
pub mod types;
pub mod versioning;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::{CatalogConfig, SeedConfig};
pub use context::OpContext;
pub use error::{CatalogError, CatalogResult, ErrorCode};
pub use import::{SeedImporter, SeedReport};
pub use pagination::{CursorPager, Page, DEFAULT_PAGE_SIZE};
pub use store::InMemoryEntryStore;
pub use traits::{EntryStore, SeedWriteStats, StoreConfig, StoreProvider};
pub use types::{
    Argument, ArgumentType, Entry, EntryDetail, EntryFilter, Input, InputFormat,
    InputWithVariables, KeyValueInput, Package, Remote, Repository, VersionDetail, SEED_VERSION,
};
pub use versioning::{
    LexicographicComparator, SemverComparator, VersionArbiter, VersionComparator, VersionOrdering,
};
