//! Installer staleness checking with an on-disk cache.

use std::cmp::Ordering;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::version::compare_versions;

/// GitHub repository releases are fetched from.
const RELEASE_REPO: &str = "trellis-desktop/trellis-forge";

/// How long a cached check stays fresh: one day.
const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 86_400;

/// Cached result of a release lookup.
///
/// Serialized as JSON next to the config file so repeated invocations
/// within the cache window stay off the network.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionCheckCache {
    /// Latest release tag seen on GitHub.
    pub latest_version: String,
    /// Installer version that performed the check.
    pub current_version: String,
    /// When the check ran.
    pub checked_at: DateTime<Utc>,
    /// Whether the latest release was newer at check time.
    pub update_available: bool,
}

impl VersionCheckCache {
    /// Build a cache entry, deciding availability with the version
    /// comparator. Unparsable versions count as "no update" rather than
    /// failing the surrounding command.
    pub fn new(current_version: String, latest_version: String) -> Self {
        let update_available = compare_versions(&current_version, &latest_version)
            .map(|ord| ord == Ordering::Less)
            .unwrap_or(false);
        Self {
            latest_version,
            current_version,
            checked_at: Utc::now(),
            update_available,
        }
    }

    /// Whether this entry is younger than `max_age_secs`.
    pub fn is_valid(&self, max_age_secs: u64) -> bool {
        let age = Utc::now() - self.checked_at;
        age.num_seconds() >= 0 && (age.num_seconds() as u64) < max_age_secs
    }
}

/// Checks whether a newer trellis-forge release exists.
///
/// The check is always advisory: the caller surfaces it as a notice, and
/// every failure mode (network down, rate limit, bad JSON) degrades to
/// "no answer" with a debug log, never an error for the surrounding
/// command.
pub struct VersionChecker {
    cache_path: PathBuf,
    current_version: String,
}

impl VersionChecker {
    /// Create a checker caching under `state_dir`.
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            cache_path: state_dir.join(".version_cache"),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// The running installer version.
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Latest release tag if it is newer than the running version,
    /// consulting the cache first. Returns `None` on any failure.
    pub async fn check_cached(&self) -> Option<String> {
        if let Ok(Some(cache)) = self.load_cache().await
            && cache.is_valid(DEFAULT_CACHE_MAX_AGE_SECS)
            && cache.current_version == self.current_version
        {
            debug!("Using cached version check from {}", cache.checked_at);
            return cache.update_available.then_some(cache.latest_version);
        }

        match self.check_now().await {
            Ok(result) => result,
            Err(e) => {
                debug!("Installer update check failed: {e:#}");
                None
            }
        }
    }

    /// Query GitHub for the latest release, update the cache, and return
    /// the tag if it is newer than the running version.
    pub async fn check_now(&self) -> Result<Option<String>> {
        let latest = self.fetch_latest_release_tag().await?;
        let cache = VersionCheckCache::new(self.current_version.clone(), latest.clone());
        let update_available = cache.update_available;

        if let Err(e) = self.save_cache(&cache).await {
            debug!("Could not save version cache: {e:#}");
        }

        Ok(update_available.then_some(latest))
    }

    async fn fetch_latest_release_tag(&self) -> Result<String> {
        let url = format!("https://api.github.com/repos/{RELEASE_REPO}/releases/latest");
        debug!("Fetching latest release from {url}");

        let client = reqwest::Client::new();
        let response = client
            .get(&url)
            .header("User-Agent", concat!("trellis-forge/", env!("CARGO_PKG_VERSION")))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .context("Failed to query GitHub releases")?;

        if !response.status().is_success() {
            anyhow::bail!("GitHub API returned HTTP {}", response.status());
        }

        let release: serde_json::Value =
            response.json().await.context("Failed to parse release JSON")?;
        release
            .get("tag_name")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .context("Release JSON has no tag_name")
    }

    async fn load_cache(&self) -> Result<Option<VersionCheckCache>> {
        if !self.cache_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.cache_path)
            .await
            .context("Failed to read version cache")?;
        let cache = serde_json::from_str(&content).context("Failed to parse version cache")?;
        Ok(Some(cache))
    }

    async fn save_cache(&self, cache: &VersionCheckCache) -> Result<()> {
        let content =
            serde_json::to_string_pretty(cache).context("Failed to serialize version cache")?;
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create cache directory")?;
        }
        fs::write(&self.cache_path, content)
            .await
            .context("Failed to write version cache")?;
        Ok(())
    }
}
