//! Built-in entry store backends.
//!
//! Relational and document backends live in `catalog-stores`.

mod memory;

pub use memory::InMemoryEntryStore;
