//! Installer self-staleness.
//!
//! The update flow also wants to know whether trellis-forge itself has a
//! newer release, so `status` and `update --check` can tell the user to
//! grab it. The check compares the running `CARGO_PKG_VERSION` against the
//! latest GitHub release tag using the same comparator that orders
//! application tags, and caches the answer for a day.

pub mod version_check;

pub use version_check::{VersionCheckCache, VersionChecker};
