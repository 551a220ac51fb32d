//! Restore operations for the backup manager.
//!
//! Restoring is an overlay copy into the live settings directory followed
//! by a verification pass. The overlay mirrors the copy primitive: files
//! present in the settings directory but absent from the backup are left in
//! place, never cleared first. Verification is what actually matters to the
//! caller, because a recursive copy can report success while individual
//! files failed to transfer.

use std::path::Path;

use anyhow::Result;
use tokio::fs;
use tracing::{info, warn};

use crate::core::ForgeError;
use crate::utils::fs::copy_dir;

use super::manager::BackupManager;

impl BackupManager {
    /// Copy a backup's contents back into the settings directory and verify
    /// critical files afterwards.
    ///
    /// The settings directory is created if absent. The copy is an overlay:
    /// stale live files not present in the backup persist.
    ///
    /// # Errors
    ///
    /// - [`ForgeError::BackupNotFound`] if `backup_path` does not exist;
    ///   the settings directory is untouched in that case
    /// - [`ForgeError::CopyFailed`] when the copy reports failure
    /// - [`ForgeError::RestoreVerificationFailed`] when critical files are
    ///   still missing after the copy, listing which ones
    pub async fn restore_backup(&self, backup_path: &Path) -> Result<()> {
        if !backup_path.exists() {
            return Err(ForgeError::BackupNotFound {
                path: backup_path.display().to_string(),
            }
            .into());
        }

        let settings_dir = &self.config().settings_dir;
        warn!(
            "Restoring settings from {} into {}",
            backup_path.display(),
            settings_dir.display()
        );

        fs::create_dir_all(settings_dir)
            .await
            .map_err(ForgeError::from)?;

        copy_dir(backup_path, settings_dir).map_err(|e| ForgeError::CopyFailed {
            from: backup_path.display().to_string(),
            to: settings_dir.display().to_string(),
            reason: format!("{e:#}"),
        })?;

        let report = self.verify_settings();
        if !report.ok {
            let missing: Vec<String> = report
                .missing
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            return Err(ForgeError::RestoreVerificationFailed {
                settings_dir: settings_dir.display().to_string(),
                missing: missing.join(", "),
            }
            .into());
        }

        info!("Restore complete, settings verified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::manager::{BackupConfig, BackupManager, BackupOutcome};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_manager(temp: &TempDir) -> BackupManager {
        BackupManager::new(BackupConfig {
            settings_dir: temp.path().join("settings"),
            backup_root: temp.path().join("backups"),
            retention_limit: 3,
            critical_files: vec![PathBuf::from("data/agents.db")],
        })
    }

    #[tokio::test]
    async fn restore_missing_backup_fails_and_leaves_settings_alone() {
        let temp = TempDir::new().unwrap();
        let manager = test_manager(&temp);

        let err = manager
            .restore_backup(&temp.path().join("backups/backup-nope"))
            .await
            .unwrap_err();
        let forge = err.downcast_ref::<crate::core::ForgeError>().unwrap();
        assert!(matches!(forge, crate::core::ForgeError::BackupNotFound { .. }));
        assert!(!manager.config().settings_dir.exists());
    }

    #[tokio::test]
    async fn backup_then_restore_round_trips() {
        let temp = TempDir::new().unwrap();
        let manager = test_manager(&temp);
        let settings = manager.config().settings_dir.clone();

        std::fs::create_dir_all(settings.join("data")).unwrap();
        std::fs::write(settings.join("data/agents.db"), [0u8; 500]).unwrap();

        let BackupOutcome::Created { path, .. } = manager.create_backup().await.unwrap() else {
            panic!("expected a created backup");
        };

        // Simulate the application losing its data store.
        std::fs::remove_file(settings.join("data/agents.db")).unwrap();
        let report = manager.verify_settings();
        assert!(!report.ok);
        assert_eq!(report.missing, vec![PathBuf::from("data/agents.db")]);

        manager.restore_backup(&path).await.unwrap();
        assert!(manager.verify_settings().ok);
        assert_eq!(
            std::fs::read(settings.join("data/agents.db")).unwrap().len(),
            500
        );
    }

    #[tokio::test]
    async fn restore_overlays_without_clearing() {
        let temp = TempDir::new().unwrap();
        let manager = test_manager(&temp);
        let settings = manager.config().settings_dir.clone();

        std::fs::create_dir_all(settings.join("data")).unwrap();
        std::fs::write(settings.join("data/agents.db"), "db").unwrap();
        let BackupOutcome::Created { path, .. } = manager.create_backup().await.unwrap() else {
            panic!("expected a created backup");
        };

        // A file created after the backup survives the restore.
        std::fs::write(settings.join("scratch.json"), "{}").unwrap();
        manager.restore_backup(&path).await.unwrap();
        assert!(settings.join("scratch.json").exists());
    }

    #[tokio::test]
    async fn restore_into_empty_settings_dir() {
        let temp = TempDir::new().unwrap();
        let manager = test_manager(&temp);
        let settings = manager.config().settings_dir.clone();

        std::fs::create_dir_all(settings.join("data")).unwrap();
        std::fs::write(settings.join("data/agents.db"), "db").unwrap();
        let BackupOutcome::Created { path, .. } = manager.create_backup().await.unwrap() else {
            panic!("expected a created backup");
        };

        std::fs::remove_dir_all(&settings).unwrap();
        manager.restore_backup(&path).await.unwrap();
        assert!(manager.verify_settings().ok);
    }

    #[tokio::test]
    async fn restore_reports_still_missing_files() {
        let temp = TempDir::new().unwrap();
        let manager = test_manager(&temp);

        // A backup that never contained the critical file.
        let backup = temp.path().join("backups/backup-20240101-000000-000");
        std::fs::create_dir_all(&backup).unwrap();
        std::fs::write(backup.join("other.txt"), "x").unwrap();

        let err = manager.restore_backup(&backup).await.unwrap_err();
        let forge = err.downcast_ref::<crate::core::ForgeError>().unwrap();
        match forge {
            crate::core::ForgeError::RestoreVerificationFailed { missing, .. } => {
                assert!(missing.contains("data/agents.db"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
