//! The `status` command: one screen of installation health.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::backup::BackupManager;
use crate::config::ForgeConfig;
use crate::git::GitRepo;
use crate::installer::Installer;
use crate::updater::VersionChecker;
use crate::utils::fs::human_size;

use super::common::{heading, presence_marker};

/// Show installed and available versions, settings health and backups.
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Fetch the source repository before reporting versions.
    #[arg(long)]
    refresh: bool,
}

impl StatusCommand {
    /// Print the status report.
    pub async fn execute(self, config: ForgeConfig) -> Result<()> {
        heading("Trellis installation");
        let clone_dir = config.clone_dir();
        if clone_dir.join(".git").exists() {
            let repo = GitRepo::new(&clone_dir);
            if self.refresh {
                repo.fetch().await?;
            }
            let installer = Installer::new(config.clone())?;
            let check = installer.check_update(&repo).await?;
            println!(
                "  Installed: {}",
                check.installed.as_deref().unwrap_or("(untagged checkout)")
            );
            println!(
                "  Latest:    {}",
                check.latest.as_deref().unwrap_or("(no release tags)")
            );
            if check.update_available {
                println!("  {}", "Update available, run 'trellis-forge update'".yellow());
            }
        } else {
            println!("  Not installed yet, run 'trellis-forge install'.");
        }

        let settings_dir = config.settings_dir();
        println!();
        heading(&format!("Settings: {}", settings_dir.display()));
        let manager = BackupManager::new(config.backup_config());
        if settings_dir.exists() {
            for file in &config.settings.critical_files {
                let present = settings_dir.join(file).exists();
                println!("  {file}  {}", presence_marker(present));
            }
            for file in &config.settings.informational_files {
                let present = settings_dir.join(file).exists();
                println!("  {file}  {} (optional)", presence_marker(present));
            }
            let report = manager.verify_settings();
            if !report.ok {
                println!("  {}", "Settings are missing critical files".red());
            }
        } else {
            println!("  (directory does not exist)");
        }

        println!();
        let backups = manager.list_backups()?;
        heading(&format!("Backups: {}", backups.len()));
        if let Some(newest) = backups.first() {
            println!(
                "  Newest: {} ({})",
                newest.name,
                human_size(newest.size_bytes)
            );
        }

        println!();
        let checker = VersionChecker::new(ForgeConfig::state_dir()?);
        match checker.check_cached().await {
            Some(latest) => println!(
                "trellis-forge {} ({} available)",
                checker.current_version(),
                latest.yellow()
            ),
            None => println!("trellis-forge {}", checker.current_version()),
        }
        Ok(())
    }
}
