//! catalog-stores - Persistent entry store backends for catalog.
//!
//! # Supported Backends
//!
//! - **SQLite** (feature: `sqlite`, default) - relational store via rusqlite
//! - **MongoDB** (feature: `mongodb`) - document store, needs a replica set
//!   for transactions
//!
//! The in-memory backend lives in `catalog-core`; [`StoreFactory`] selects
//! any of the three from a [`StoreConfig`].

mod factory;

#[cfg(feature = "mongodb")]
mod mongodb;

#[cfg(feature = "sqlite")]
mod sqlite;

// Public exports
pub use factory::StoreFactory;

#[cfg(feature = "mongodb")]
pub use mongodb::MongoEntryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteEntryStore;

// Re-export core types for convenience
pub use catalog_core::traits::{EntryStore, StoreConfig, StoreProvider};
