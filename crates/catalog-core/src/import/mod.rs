//! Seed data import.
//!
//! Supports a JSON array file or JSON Lines (`.jsonl`).
//!
//! # Example
//!
//! ```ignore
//! use catalog_core::import::SeedImporter;
//! use catalog_core::OpContext;
//!
//! let report = SeedImporter
//!     .import_file(store.as_ref(), &OpContext::background(), "seed.json".as_ref())
//!     .await?;
//! println!("Imported {}/{}", report.imported(), report.total);
//! ```

pub mod jsonl;
mod seed;

pub use jsonl::read_jsonl;
pub use seed::{validate_seed_record, SeedImporter, SeedReport};
