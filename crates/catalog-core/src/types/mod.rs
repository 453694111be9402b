//! Core types for catalog.

mod entry;
mod filter;

pub use entry::*;
pub use filter::*;
