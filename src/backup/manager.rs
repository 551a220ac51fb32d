//! Backup creation, naming, rotation and listing.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::core::ForgeError;
use crate::utils::fs::{copy_dir, dir_size};

/// Prefix every backup directory name carries.
pub const BACKUP_PREFIX: &str = "backup-";

/// Explicit configuration for the backup manager.
///
/// Passed in at construction rather than read from ambient globals, so the
/// manager can run against throwaway directories in tests exactly as it
/// runs against the real settings directory.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// The live settings directory owned by the Trellis application.
    pub settings_dir: PathBuf,
    /// Directory under which `backup-*` snapshots are stored.
    pub backup_root: PathBuf,
    /// Maximum number of backups kept. Values below 1 are clamped to 1.
    pub retention_limit: usize,
    /// Relative paths whose presence defines "settings are valid".
    pub critical_files: Vec<PathBuf>,
}

/// Outcome of a backup attempt that did not fail.
#[derive(Debug)]
pub enum BackupOutcome {
    /// A snapshot was created and verified.
    Created {
        /// Path of the new backup directory.
        path: PathBuf,
        /// Old backups deleted by rotation, oldest first.
        pruned: Vec<PathBuf>,
    },
    /// The settings directory does not exist, so there was nothing to
    /// protect. A fresh install lands here; it is a success, not an error.
    NothingToBackUp,
}

/// A backup on disk.
#[derive(Debug, Clone)]
pub struct BackupInfo {
    /// Directory name, `backup-YYYYMMDD-HHMMSS-mmm`.
    pub name: String,
    /// Full path of the backup directory.
    pub path: PathBuf,
    /// Total size of the snapshot in bytes.
    pub size_bytes: u64,
}

/// Creates, rotates and restores settings snapshots.
///
/// A backup is a full directory copy of the settings directory, named after
/// its creation time so that lexicographic name order is chronological
/// order. The manager is invoked by the install and update flows right
/// before anything mutates the live settings, and by the `backup` CLI
/// subcommands directly.
///
/// # Sequencing
///
/// `create_backup` is strictly ordered: rotation completes before the new
/// directory is created, and the copy completes before verification runs.
/// On failure the operation stops and reports; a half-written backup is
/// left on disk (rotation reclaims it on a later run) because its contents
/// are useful when diagnosing what went wrong.
pub struct BackupManager {
    config: BackupConfig,
}

impl BackupManager {
    /// Create a manager over an explicit configuration.
    ///
    /// A `retention_limit` of 0 is clamped to 1 with a warning; a limit of
    /// zero would delete the backup we are about to create.
    pub fn new(mut config: BackupConfig) -> Self {
        if config.retention_limit == 0 {
            warn!("retention_limit 0 is not usable, clamping to 1");
            config.retention_limit = 1;
        }
        Self { config }
    }

    /// The configuration this manager runs on.
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Snapshot the settings directory into a new timestamped backup.
    ///
    /// Returns [`BackupOutcome::NothingToBackUp`] when the settings
    /// directory does not exist. Otherwise rotates old backups down to
    /// `retention_limit - 1` (best effort), copies the settings tree into a
    /// fresh `backup-*` directory, and verifies that every critical file
    /// present in the source made it into the copy.
    ///
    /// # Errors
    ///
    /// - [`ForgeError::CopyFailed`] when the recursive copy reports failure
    /// - [`ForgeError::BackupVerificationFailed`] when the copy succeeded
    ///   but critical files are absent from the backup; the error carries
    ///   the backup path, which is left on disk for inspection
    /// - [`ForgeError::IoError`] when the backup directory cannot be created
    pub async fn create_backup(&self) -> Result<BackupOutcome> {
        if !self.config.settings_dir.exists() {
            info!(
                "Settings directory {} does not exist, nothing to back up",
                self.config.settings_dir.display()
            );
            return Ok(BackupOutcome::NothingToBackUp);
        }

        let pruned = self.rotate_backups().await;

        fs::create_dir_all(&self.config.backup_root)
            .await
            .map_err(ForgeError::from)?;

        let backup_path = self.next_backup_path(Utc::now());
        fs::create_dir(&backup_path).await.map_err(ForgeError::from)?;
        debug!("Created backup directory {}", backup_path.display());

        copy_dir(&self.config.settings_dir, &backup_path).map_err(|e| {
            ForgeError::CopyFailed {
                from: self.config.settings_dir.display().to_string(),
                to: backup_path.display().to_string(),
                reason: format!("{e:#}"),
            }
        })?;

        if !self.verify_backup_integrity(&backup_path) {
            return Err(ForgeError::BackupVerificationFailed {
                backup: backup_path.display().to_string(),
            }
            .into());
        }

        info!("Backup created at {}", backup_path.display());
        Ok(BackupOutcome::Created {
            path: backup_path,
            pruned,
        })
    }

    /// Delete the oldest backups so that, counting the one about to be
    /// created, at most `retention_limit` remain.
    ///
    /// Best effort: a backup that cannot be deleted is logged at `warn` and
    /// skipped. Losing the ability to prune an old snapshot must not block
    /// protecting the current settings.
    pub async fn rotate_backups(&self) -> Vec<PathBuf> {
        let backups = match self.list_backups() {
            Ok(backups) => backups,
            Err(e) => {
                warn!("Could not enumerate backups for rotation: {e:#}");
                return Vec::new();
            }
        };

        let mut deleted = Vec::new();
        // Newest first; everything past the reserved slots goes.
        for backup in backups.into_iter().skip(self.config.retention_limit - 1) {
            match fs::remove_dir_all(&backup.path).await {
                Ok(()) => {
                    debug!("Rotated out old backup {}", backup.path.display());
                    deleted.push(backup.path);
                }
                Err(e) => {
                    warn!("Could not delete old backup {}: {e}", backup.path.display());
                }
            }
        }
        deleted
    }

    /// Enumerate backups under the backup root, newest first.
    ///
    /// Only directories whose name starts with `backup-` count. A missing
    /// backup root produces an empty list, not an error.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        if !self.config.backup_root.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in std::fs::read_dir(&self.config.backup_root).map_err(ForgeError::from)? {
            let entry = entry.map_err(ForgeError::from)?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(BACKUP_PREFIX) || !entry.path().is_dir() {
                continue;
            }
            let size_bytes = dir_size(&entry.path()).unwrap_or(0);
            backups.push(BackupInfo {
                name,
                path: entry.path(),
                size_bytes,
            });
        }

        // Names are fixed-width timestamps, so reverse lexicographic order
        // is newest first.
        backups.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(backups)
    }

    /// The most recent backup, if any exist.
    pub fn latest_backup(&self) -> Result<Option<BackupInfo>> {
        Ok(self.list_backups()?.into_iter().next())
    }

    /// Existence check for each critical file, relative to the settings
    /// directory. Pure inspection, no side effects.
    pub fn verify_settings(&self) -> SettingsReport {
        let missing: Vec<PathBuf> = self
            .config
            .critical_files
            .iter()
            .filter(|rel| !self.config.settings_dir.join(rel).exists())
            .cloned()
            .collect();
        SettingsReport {
            ok: missing.is_empty(),
            missing,
        }
    }

    /// Whether every critical file present in the live settings directory
    /// also exists under `backup_path`.
    ///
    /// Critical files absent from the source are not required in the
    /// backup: what never existed cannot be backed up.
    pub fn verify_backup_integrity(&self, backup_path: &Path) -> bool {
        self.config.critical_files.iter().all(|rel| {
            !self.config.settings_dir.join(rel).exists() || backup_path.join(rel).exists()
        })
    }

    /// Derive a collision-free backup path from `now`.
    ///
    /// Names carry millisecond resolution; if the resulting path somehow
    /// exists already, a counter suffix disambiguates rather than reusing
    /// a directory whose contents we cannot vouch for.
    fn next_backup_path(&self, now: DateTime<Utc>) -> PathBuf {
        let stamp = format!(
            "{}{}-{:03}",
            BACKUP_PREFIX,
            now.format("%Y%m%d-%H%M%S"),
            now.timestamp_subsec_millis()
        );
        let candidate = self.config.backup_root.join(&stamp);
        if !candidate.exists() {
            return candidate;
        }
        let mut counter = 1u32;
        loop {
            let candidate = self.config.backup_root.join(format!("{stamp}-{counter}"));
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Result of a settings verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsReport {
    /// True iff no critical file is missing.
    pub ok: bool,
    /// Critical files absent from the settings directory.
    pub missing: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(temp: &TempDir, retention: usize) -> BackupConfig {
        BackupConfig {
            settings_dir: temp.path().join("settings"),
            backup_root: temp.path().join("backups"),
            retention_limit: retention,
            critical_files: vec![PathBuf::from("data/agents.db")],
        }
    }

    fn seed_settings(config: &BackupConfig) {
        std::fs::create_dir_all(config.settings_dir.join("data")).unwrap();
        std::fs::write(config.settings_dir.join("data/agents.db"), [0u8; 500]).unwrap();
    }

    #[tokio::test]
    async fn missing_settings_dir_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(test_config(&temp, 3));

        let outcome = manager.create_backup().await.unwrap();
        assert!(matches!(outcome, BackupOutcome::NothingToBackUp));
        assert!(manager.list_backups().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_backup_copies_and_verifies() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp, 3);
        seed_settings(&config);
        let manager = BackupManager::new(config);

        let outcome = manager.create_backup().await.unwrap();
        let BackupOutcome::Created { path, pruned } = outcome else {
            panic!("expected a created backup");
        };
        assert!(path.join("data/agents.db").exists());
        assert!(pruned.is_empty());
        assert!(manager.verify_backup_integrity(&path));
    }

    #[tokio::test]
    async fn list_backups_is_newest_first() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp, 10);
        seed_settings(&config);
        let manager = BackupManager::new(config);

        for _ in 0..3 {
            manager.create_backup().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let backups = manager.list_backups().unwrap();
        assert_eq!(backups.len(), 3);
        assert!(backups[0].name > backups[1].name);
        assert!(backups[1].name > backups[2].name);
    }

    #[tokio::test]
    async fn retention_limit_is_enforced() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp, 5);
        seed_settings(&config);
        let manager = BackupManager::new(config);

        for _ in 0..6 {
            manager.create_backup().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let backups = manager.list_backups().unwrap();
        assert_eq!(backups.len(), 5);
    }

    #[tokio::test]
    async fn retention_limit_one_keeps_only_newest() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp, 1);
        seed_settings(&config);
        let manager = BackupManager::new(config);

        manager.create_backup().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let outcome = manager.create_backup().await.unwrap();

        let backups = manager.list_backups().unwrap();
        assert_eq!(backups.len(), 1);
        let BackupOutcome::Created { path, pruned } = outcome else {
            panic!("expected a created backup");
        };
        assert_eq!(backups[0].path, path);
        assert_eq!(pruned.len(), 1);
    }

    #[tokio::test]
    async fn list_ignores_unrelated_entries() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp, 3);
        seed_settings(&config);
        std::fs::create_dir_all(config.backup_root.join("not-a-backup")).unwrap();
        std::fs::create_dir_all(&config.backup_root).unwrap();
        std::fs::write(config.backup_root.join("backup-stray-file"), "x").unwrap();
        let manager = BackupManager::new(config);

        manager.create_backup().await.unwrap();
        let backups = manager.list_backups().unwrap();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn collision_names_are_disambiguated() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp, 3);
        std::fs::create_dir_all(&config.backup_root).unwrap();
        let manager = BackupManager::new(config);

        let now = Utc::now();
        let first = manager.next_backup_path(now);
        std::fs::create_dir_all(&first).unwrap();
        let second = manager.next_backup_path(now);
        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("-1"));
    }

    #[test]
    fn verify_settings_reports_missing() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp, 3);
        std::fs::create_dir_all(&config.settings_dir).unwrap();
        let manager = BackupManager::new(config);

        let report = manager.verify_settings();
        assert!(!report.ok);
        assert_eq!(report.missing, vec![PathBuf::from("data/agents.db")]);

        // Idempotent: same answer when nothing changed.
        assert_eq!(manager.verify_settings(), report);
    }

    #[test]
    fn integrity_ignores_files_absent_from_source() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp, 3);
        std::fs::create_dir_all(&config.settings_dir).unwrap();
        let backup = temp.path().join("backups/backup-x");
        std::fs::create_dir_all(&backup).unwrap();
        let manager = BackupManager::new(config);

        // data/agents.db never existed in the source, so an empty backup
        // still passes.
        assert!(manager.verify_backup_integrity(&backup));
    }
}
