//! Version ordering strategies.

use std::cmp::Ordering;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// Total order over version strings used to gate publication.
pub trait VersionComparator: Debug + Send + Sync {
    /// Compare two version strings.
    fn compare(&self, a: &str, b: &str) -> Ordering;

    /// Short name for logs and health output.
    fn name(&self) -> &'static str;
}

/// Raw string order.
///
/// This is the default ordering and it is NOT semantic versioning:
/// `"10.0.0"` sorts before `"9.0.0"`. Swap in [`SemverComparator`] to change it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicographicComparator;

impl VersionComparator for LexicographicComparator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }

    fn name(&self) -> &'static str {
        "lexicographic"
    }
}

/// Semantic version order.
///
/// Every valid semver sorts before every unparsable version. Two unparsable
/// versions compare as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemverComparator;

impl VersionComparator for SemverComparator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        match (semver::Version::parse(a), semver::Version::parse(b)) {
            (Ok(va), Ok(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        }
    }

    fn name(&self) -> &'static str {
        "semver"
    }
}

/// Configurable choice of comparator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrdering {
    #[default]
    Lexicographic,
    Semver,
}

impl VersionOrdering {
    /// Build the comparator for this ordering.
    pub fn comparator(self) -> Box<dyn VersionComparator> {
        match self {
            VersionOrdering::Lexicographic => Box::new(LexicographicComparator),
            VersionOrdering::Semver => Box::new(SemverComparator),
        }
    }

    /// Parse from a config string.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "lexicographic" | "string" | "raw" => Some(Self::Lexicographic),
            "semver" => Some(Self::Semver),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicographic_misorders_multi_digit() {
        let cmp = LexicographicComparator;
        assert_eq!(cmp.compare("1.0.1", "1.0.0"), Ordering::Greater);
        assert_eq!(cmp.compare("10.0.0", "9.0.0"), Ordering::Less);
    }

    #[test]
    fn test_semver_orders_numerically() {
        let cmp = SemverComparator;
        assert_eq!(cmp.compare("10.0.0", "9.0.0"), Ordering::Greater);
        assert_eq!(cmp.compare("1.0.0-alpha", "1.0.0"), Ordering::Less);
    }

    #[test]
    fn test_semver_falls_back_to_string_order() {
        let cmp = SemverComparator;
        assert_eq!(cmp.compare("v2", "v10"), Ordering::Greater);
    }

    #[test]
    fn test_semver_mixed_order_is_transitive() {
        let cmp = SemverComparator;
        assert_eq!(cmp.compare("9.0.0", "10.0.0"), Ordering::Less);
        assert_eq!(cmp.compare("10.0.0", "1x"), Ordering::Less);
        assert_eq!(cmp.compare("9.0.0", "1x"), Ordering::Less);
        assert_eq!(cmp.compare("1x", "9.0.0"), Ordering::Greater);

        let mut versions = vec!["1x", "10.0.0", "abc", "9.0.0", "1.0.0-rc.1"];
        versions.sort_by(|a, b| cmp.compare(a, b));
        assert_eq!(versions, vec!["1.0.0-rc.1", "9.0.0", "10.0.0", "1x", "abc"]);
    }

    #[test]
    fn test_semver_build_metadata_breaks_ties_by_string() {
        let cmp = SemverComparator;
        assert_eq!(cmp.compare("1.0.0+b", "1.0.0+a"), Ordering::Greater);
        assert_eq!(cmp.compare("1.0.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn test_ordering_parse() {
        assert_eq!(VersionOrdering::parse("SemVer"), Some(VersionOrdering::Semver));
        assert_eq!(VersionOrdering::parse("raw"), Some(VersionOrdering::Lexicographic));
        assert_eq!(VersionOrdering::parse("calver"), None);
        assert_eq!(VersionOrdering::default().comparator().name(), "lexicographic");
    }
}
