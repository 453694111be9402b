//! Publication gate: monotonic versions and a single latest entry per name.
//!
//! The arbiter is stateless. Backends call [`VersionArbiter::admit`] from
//! inside the same transaction (or lock) that performs the demote + insert,
//! so the comparison and the writes observe one consistent snapshot.

use std::cmp::Ordering;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::types::{now_rfc3339, Entry, EntryDetail};
use crate::versioning::{LexicographicComparator, VersionComparator};

/// Decides whether a publish may proceed.
#[derive(Debug, Clone)]
pub struct VersionArbiter {
    comparator: Arc<dyn VersionComparator>,
}

impl Default for VersionArbiter {
    fn default() -> Self {
        Self::new(Arc::new(LexicographicComparator))
    }
}

impl VersionArbiter {
    /// Create an arbiter with the given comparator.
    pub fn new(comparator: Arc<dyn VersionComparator>) -> Self {
        Self { comparator }
    }

    /// The comparator in use.
    pub fn comparator(&self) -> &dyn VersionComparator {
        self.comparator.as_ref()
    }

    /// Validate a publish candidate and stamp it for insertion.
    ///
    /// Assigns a fresh identifier, marks the entry latest and sets the
    /// release date. Any identifier supplied by the caller is replaced.
    pub fn prepare(&self, mut candidate: EntryDetail) -> CatalogResult<EntryDetail> {
        if candidate.entry.name.trim().is_empty() {
            return Err(CatalogError::missing_field("name"));
        }
        if candidate.entry.version_detail.version.trim().is_empty() {
            return Err(CatalogError::missing_field("version_detail.version"));
        }

        candidate.entry.id = Uuid::new_v4().to_string();
        candidate.entry.version_detail.is_latest = true;
        candidate.entry.version_detail.release_date = now_rfc3339();
        Ok(candidate)
    }

    /// Admit `candidate` if its version is strictly greater than the current
    /// latest entry of the same name.
    pub fn admit(&self, candidate: &EntryDetail, current: Option<&Entry>) -> CatalogResult<()> {
        let Some(current) = current else {
            return Ok(());
        };

        match self
            .comparator
            .compare(candidate.version(), current.version())
        {
            Ordering::Greater => Ok(()),
            _ => {
                tracing::debug!(
                    name = %candidate.name(),
                    candidate = %candidate.version(),
                    current = %current.version(),
                    comparator = self.comparator.name(),
                    "rejecting non-increasing version"
                );
                Err(CatalogError::invalid_version(
                    candidate.name(),
                    candidate.version(),
                    current.version(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::versioning::SemverComparator;

    fn latest(name: &str, version: &str) -> Entry {
        EntryDetail::new(name, version)
            .with_id("existing")
            .with_latest(true)
            .summary()
    }

    #[test]
    fn test_prepare_stamps_candidate() {
        let arbiter = VersionArbiter::default();
        let stamped = arbiter
            .prepare(EntryDetail::new("weather", "1.0.0").with_id("caller-chosen"))
            .unwrap();

        assert_ne!(stamped.id(), "caller-chosen");
        assert!(Uuid::parse_str(stamped.id()).is_ok());
        assert!(stamped.is_latest());
        assert!(!stamped.entry.version_detail.release_date.is_empty());
    }

    #[test]
    fn test_prepare_requires_name_and_version() {
        let arbiter = VersionArbiter::default();

        let err = arbiter.prepare(EntryDetail::new("", "1.0.0")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValMissingField);

        let err = arbiter.prepare(EntryDetail::new("weather", " ")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValMissingField);
    }

    #[test]
    fn test_admit_first_version() {
        let arbiter = VersionArbiter::default();
        let candidate = EntryDetail::new("weather", "0.0.1");
        assert!(arbiter.admit(&candidate, None).is_ok());
    }

    #[test]
    fn test_admit_rejects_equal_and_lower() {
        let arbiter = VersionArbiter::default();
        let current = latest("weather", "1.0.0");

        for version in ["1.0.0", "0.9.0"] {
            let err = arbiter
                .admit(&EntryDetail::new("weather", version), Some(&current))
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::VerNotGreater);
        }

        assert!(arbiter
            .admit(&EntryDetail::new("weather", "1.0.1"), Some(&current))
            .is_ok());
    }

    #[test]
    fn test_comparator_is_pluggable() {
        let current = latest("weather", "9.0.0");
        let candidate = EntryDetail::new("weather", "10.0.0");

        assert!(VersionArbiter::default()
            .admit(&candidate, Some(&current))
            .is_err());
        assert!(VersionArbiter::new(Arc::new(SemverComparator))
            .admit(&candidate, Some(&current))
            .is_ok());
    }
}
