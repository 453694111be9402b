//! Version ordering and publication gating.
//!
//! Each publish creates a new immutable entry; the previous latest entry of
//! the same name is demoted in the same atomic unit.

mod arbiter;
mod comparator;

pub use arbiter::VersionArbiter;
pub use comparator::{
    LexicographicComparator, SemverComparator, VersionComparator, VersionOrdering,
};
