//! Core traits for catalog backends.

mod entry_store;

pub use entry_store::*;
