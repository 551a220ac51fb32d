//! Version comparison for release tags.
//!
//! Trellis releases are tagged with loose dotted-integer identifiers
//! (`v1.4`, `1.4.0`, `v2.0.1`), not strict semver: there are no pre-release
//! or build-metadata suffixes, and a missing trailing segment counts as zero,
//! so `1.2` and `1.2.0` are the same release. This module owns that ordering
//! and the small helpers the update flow uses to pick the newest tag.
//!
//! A segment that is not a non-negative integer fails fast with
//! [`ForgeError::InvalidVersion`] rather than being coerced to zero, so a
//! malformed tag surfaces instead of silently comparing as `0`.
//!
//! # Examples
//!
//! ```rust
//! use trellis_forge::version::{Version, compare_versions};
//! use std::cmp::Ordering;
//!
//! # fn example() -> anyhow::Result<()> {
//! assert_eq!(compare_versions("1.10.0", "1.9.9")?, Ordering::Greater);
//! assert_eq!(compare_versions("v2.0", "2.0.0")?, Ordering::Equal);
//!
//! let v = Version::parse("v1.4.2")?;
//! assert_eq!(v.to_string(), "1.4.2");
//! # Ok(())
//! # }
//! ```

use std::cmp::Ordering;
use std::fmt;

use anyhow::Result;

use crate::core::ForgeError;

/// A loose dotted-integer version: `[v]N(.N)*`.
///
/// Ordering compares segment-by-segment left to right, treating missing
/// trailing segments as zero. Equality follows the same rule, so
/// `Version::parse("1.2")? == Version::parse("1.2.0")?`.
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<u64>,
}

impl Version {
    /// Parse a version string, stripping a single leading lowercase `v`.
    ///
    /// Only the lowercase prefix is accepted; `V1.0` is rejected, matching
    /// the tag convention of the Trellis repository.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::InvalidVersion`] when the string is empty or
    /// any segment fails to parse as a non-negative integer.
    pub fn parse(input: &str) -> Result<Self, ForgeError> {
        let body = input.strip_prefix('v').unwrap_or(input);

        if body.is_empty() {
            return Err(ForgeError::InvalidVersion {
                input: input.to_string(),
                reason: "empty version string".to_string(),
            });
        }

        let mut segments = Vec::new();
        for segment in body.split('.') {
            let value: u64 = segment.parse().map_err(|_| ForgeError::InvalidVersion {
                input: input.to_string(),
                reason: format!("segment '{segment}' is not a non-negative integer"),
            })?;
            segments.push(value);
        }

        Ok(Self { segments })
    }

    /// Segment at `index`, zero when the version is shorter than that.
    fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            match self.segment(i).cmp(&other.segment(i)) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.segments.iter().map(u64::to_string).collect();
        write!(f, "{}", rendered.join("."))
    }
}

/// Compare two version strings.
///
/// # Errors
///
/// Fails with [`ForgeError::InvalidVersion`] if either input is malformed.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

/// Tag-collection helpers used by the update flow.
pub struct VersionReconciler;

impl VersionReconciler {
    /// The highest parsable tag in `tags`, or `None` if no tag parses.
    ///
    /// Unparsable entries (branch-like tags, nightly markers) are skipped
    /// rather than failing the whole lookup.
    pub fn latest(tags: &[String]) -> Option<&String> {
        let mut best: Option<(&String, Version)> = None;
        for tag in tags {
            if let Ok(version) = Version::parse(tag) {
                let better = match &best {
                    None => true,
                    Some((_, current)) => version > *current,
                };
                if better {
                    best = Some((tag, version));
                }
            }
        }
        best.map(|(tag, _)| tag)
    }

    /// Whether any tag in `tags` is newer than `current`.
    ///
    /// # Errors
    ///
    /// Fails if `current` is malformed; malformed tags in the list are
    /// skipped.
    pub fn has_newer(current: &str, tags: &[String]) -> Result<bool> {
        let current = Version::parse(current)?;
        for tag in tags {
            if let Ok(version) = Version::parse(tag)
                && version > current
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_versions() {
        assert_eq!(compare_versions("1.2.3", "1.2.3").unwrap(), Ordering::Equal);
        assert_eq!(compare_versions("v2.0", "2.0.0").unwrap(), Ordering::Equal);
        assert_eq!(compare_versions("1.2", "1.2.0").unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert_eq!(
            compare_versions("1.10.0", "1.9.9").unwrap(),
            Ordering::Greater
        );
        assert_eq!(compare_versions("0.9", "0.10").unwrap(), Ordering::Less);
    }

    #[test]
    fn test_invalid_segments_fail_fast() {
        assert!(compare_versions("1.2.x", "1.0").is_err());
        assert!(Version::parse("").is_err());
        assert!(Version::parse("v").is_err());
        // Only lowercase v is stripped.
        assert!(Version::parse("V1.0").is_err());
        assert!(Version::parse("1..2").is_err());
    }

    #[test]
    fn test_display_drops_prefix() {
        assert_eq!(Version::parse("v1.4.2").unwrap().to_string(), "1.4.2");
    }

    #[test]
    fn test_latest_skips_garbage() {
        let tags = vec![
            "v1.0.0".to_string(),
            "garbage".to_string(),
            "v0.9".to_string(),
        ];
        assert_eq!(VersionReconciler::latest(&tags), Some(&"v1.0.0".to_string()));

        let empty: Vec<String> = vec![];
        assert_eq!(VersionReconciler::latest(&empty), None);
    }

    #[test]
    fn test_has_newer() {
        let tags = vec!["v1.0.0".to_string(), "v1.1.0".to_string()];
        assert!(VersionReconciler::has_newer("1.0.0", &tags).unwrap());
        assert!(!VersionReconciler::has_newer("1.1.0", &tags).unwrap());
        assert!(VersionReconciler::has_newer("bogus", &tags).is_err());
    }
}
