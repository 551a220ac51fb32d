//! Settings backup and restore.
//!
//! Trellis keeps user state (the agents database, credentials, window
//! layout) in a single configuration directory. Rebuilding or reinstalling
//! the application is the one moment that state is at risk, so every
//! mutating flow snapshots it first through this module.
//!
//! # Model
//!
//! - A **backup** is a directory named `backup-<timestamp>` under the
//!   backup root, holding a full copy of the settings directory. Names are
//!   fixed width, so lexicographic order equals chronological order.
//! - The **critical file set** is the fixed list of relative paths whose
//!   presence means the application will still find its data on next
//!   launch. Verification checks existence of exactly these files.
//! - The **retention limit** bounds how many backups are kept; rotation
//!   deletes the oldest first and never blocks a new backup on a failed
//!   deletion.
//!
//! # Example
//!
//! ```rust,no_run
//! use trellis_forge::backup::{BackupConfig, BackupManager, BackupOutcome};
//! use std::path::PathBuf;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let manager = BackupManager::new(BackupConfig {
//!     settings_dir: PathBuf::from("/home/u/.config/Trellis"),
//!     backup_root: PathBuf::from("/home/u/.local/share/trellis-forge/backups"),
//!     retention_limit: 5,
//!     critical_files: vec![PathBuf::from("data/agents.db")],
//! });
//!
//! match manager.create_backup().await? {
//!     BackupOutcome::Created { path, .. } => println!("backed up to {}", path.display()),
//!     BackupOutcome::NothingToBackUp => println!("no settings yet"),
//! }
//! # Ok(())
//! # }
//! ```

mod manager;
mod restore;

pub use manager::{
    BACKUP_PREFIX, BackupConfig, BackupInfo, BackupManager, BackupOutcome, SettingsReport,
};
