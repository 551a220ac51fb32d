//! The `backup` subcommands: direct access to the backup manager.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::backup::{BackupManager, BackupOutcome};
use crate::config::ForgeConfig;
use crate::utils::fs::{file_size, human_size};

use super::common::{confirm, heading, presence_marker};

/// Manage settings backups.
///
/// Backups are full copies of the Trellis settings directory, created
/// automatically before installs and updates and on demand with
/// `backup create`. `backup check` reports the health of the live
/// settings and of the newest snapshot.
#[derive(Args, Debug)]
pub struct BackupCommand {
    #[command(subcommand)]
    command: BackupSubcommand,
}

#[derive(Subcommand, Debug)]
enum BackupSubcommand {
    /// Snapshot the settings directory now.
    Create,
    /// List backups, newest first.
    List,
    /// Copy a backup over the live settings directory.
    Restore(RestoreArgs),
    /// Verify the live settings and the newest backup.
    Check,
}

#[derive(Args, Debug)]
struct RestoreArgs {
    /// Backup directory to restore. Defaults to the newest backup.
    #[arg(long, value_name = "PATH")]
    from: Option<PathBuf>,

    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    yes: bool,
}

impl BackupCommand {
    /// Run the selected backup operation.
    pub async fn execute(self, config: ForgeConfig) -> Result<()> {
        let manager = BackupManager::new(config.backup_config());
        match self.command {
            BackupSubcommand::Create => create(&manager).await,
            BackupSubcommand::List => list(&manager),
            BackupSubcommand::Restore(args) => restore(&manager, args).await,
            BackupSubcommand::Check => check(&manager, &config),
        }
    }
}

async fn create(manager: &BackupManager) -> Result<()> {
    match manager.create_backup().await? {
        BackupOutcome::Created { path, pruned } => {
            println!("{} Backup created at {}", "✓".green(), path.display());
            if !pruned.is_empty() {
                println!("  Rotated out {} old backup(s)", pruned.len());
            }
        }
        BackupOutcome::NothingToBackUp => {
            println!(
                "Settings directory {} does not exist yet, nothing to back up",
                manager.config().settings_dir.display()
            );
        }
    }
    Ok(())
}

fn list(manager: &BackupManager) -> Result<()> {
    let backups = manager.list_backups()?;
    if backups.is_empty() {
        println!("No backups found under {}", manager.config().backup_root.display());
        return Ok(());
    }

    heading(&format!("{} backup(s), newest first:", backups.len()));
    for backup in backups {
        println!("  {}  {:>10}", backup.name, human_size(backup.size_bytes));
    }
    Ok(())
}

async fn restore(manager: &BackupManager, args: RestoreArgs) -> Result<()> {
    let target = match args.from {
        Some(path) => path,
        None => match manager.latest_backup()? {
            Some(info) => info.path,
            None => anyhow::bail!(
                "no backups available under {}",
                manager.config().backup_root.display()
            ),
        },
    };

    println!(
        "Restoring {} into {}",
        target.display(),
        manager.config().settings_dir.display()
    );
    if !confirm("Existing settings files will be overwritten. Continue?", args.yes)? {
        println!("Restore cancelled.");
        return Ok(());
    }

    manager.restore_backup(&target).await?;
    println!("{} Settings restored and verified", "✓".green());
    Ok(())
}

fn check(manager: &BackupManager, config: &ForgeConfig) -> Result<()> {
    let settings_dir = &manager.config().settings_dir;
    heading(&format!("Settings: {}", settings_dir.display()));

    let report = manager.verify_settings();
    for file in &manager.config().critical_files {
        match file_size(&settings_dir.join(file))? {
            Some(size) => println!(
                "  {}  {} ({})",
                file.display(),
                presence_marker(true),
                human_size(size)
            ),
            None => println!("  {}  {}", file.display(), presence_marker(false)),
        }
    }
    for file in &config.settings.informational_files {
        let present = settings_dir.join(file).exists();
        // Shown for completeness; absence never fails verification.
        println!("  {}  {} (optional)", file, presence_marker(present));
    }

    if report.ok {
        println!("{} Settings are valid", "✓".green());
    } else {
        println!(
            "{} Settings are missing critical files",
            "✗".red()
        );
    }

    match manager.latest_backup()? {
        Some(info) => {
            let intact = manager.verify_backup_integrity(&info.path);
            println!(
                "Newest backup {}: {}",
                info.name,
                if intact {
                    "intact".green()
                } else {
                    "incomplete".red()
                }
            );
        }
        None => println!("No backups on disk."),
    }
    Ok(())
}
