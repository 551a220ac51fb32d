//! The `update` command: reconcile against release tags and rebuild.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::backup::{BackupManager, BackupOutcome};
use crate::config::ForgeConfig;
use crate::installer::{Installer, WorkingTreeAction};
use crate::updater::VersionChecker;

use super::common::{choose_working_tree_action, confirm, heading};

/// Update Trellis to the newest release tag.
///
/// Fetches the source repository, compares the checked-out tag with the
/// newest available tag, and rebuilds when they differ. Settings are
/// backed up before the rebuild; a backup failure warns and asks instead
/// of silently blocking the update.
#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Only report whether an update is available.
    #[arg(long)]
    check: bool,

    /// Answer yes to every prompt.
    #[arg(long, short = 'y')]
    yes: bool,

    /// Stash local source-tree changes instead of asking.
    #[arg(long)]
    stash: bool,

    /// Skip the pre-update settings backup.
    #[arg(long)]
    skip_backup: bool,
}

impl UpdateCommand {
    /// Run the update flow.
    pub async fn execute(self, config: ForgeConfig) -> Result<()> {
        let installer = Installer::new(config.clone())?;
        let repo = installer.prepare_source().await?;
        let check = installer.check_update(&repo).await?;

        heading("Trellis versions");
        println!(
            "  Installed: {}",
            check.installed.as_deref().unwrap_or("(untagged checkout)")
        );
        println!(
            "  Latest:    {}",
            check.latest.as_deref().unwrap_or("(no release tags)")
        );

        notify_installer_staleness().await;

        if self.check {
            if check.update_available {
                println!("\nAn update is available. Run 'trellis-forge update' to install it.");
            } else {
                println!("\nTrellis is up to date.");
            }
            return Ok(());
        }

        if !check.update_available {
            println!("\n{} Trellis is up to date.", "✓".green());
            return Ok(());
        }

        let Some(latest) = check.latest.clone() else {
            // update_available implies a latest tag exists.
            return Ok(());
        };

        if !confirm(&format!("Update Trellis to {latest}?"), self.yes)? {
            println!("Update cancelled.");
            return Ok(());
        }

        if check.dirty {
            match choose_working_tree_action(self.stash, self.yes)? {
                WorkingTreeAction::Abort => {
                    println!("Update cancelled: source tree has local changes.");
                    return Ok(());
                }
                WorkingTreeAction::Stash => {
                    repo.stash(&format!("trellis-forge pre-update {latest}")).await?;
                    println!("Local changes stashed.");
                }
                WorkingTreeAction::Proceed => {
                    eprintln!(
                        "{} building on top of local modifications",
                        "warning:".yellow().bold()
                    );
                }
            }
        }

        let manager = BackupManager::new(config.backup_config());
        if self.skip_backup {
            println!("Skipping settings backup (--skip-backup).");
        } else {
            match manager.create_backup().await {
                Ok(BackupOutcome::Created { path, .. }) => {
                    println!("{} Settings backed up to {}", "✓".green(), path.display());
                }
                Ok(BackupOutcome::NothingToBackUp) => {
                    println!("No settings directory yet, nothing to back up.");
                }
                Err(e) => {
                    eprintln!(
                        "{} Settings backup failed: {e:#}",
                        "warning:".yellow().bold()
                    );
                    if !confirm("Continue the update without a backup?", self.yes)? {
                        anyhow::bail!("update aborted: settings backup failed");
                    }
                }
            }
        }

        repo.checkout(&latest).await?;
        let artifact = installer.rebuild(&repo).await?;
        println!("{} Installed package {}", "✓".green(), artifact.display());

        // The rebuild should never eat user settings; verify and offer the
        // backup we just made if it somehow did.
        let report = manager.verify_settings();
        if !report.ok {
            let missing: Vec<String> = report
                .missing
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            eprintln!(
                "{} settings are missing {} after the update",
                "warning:".yellow().bold(),
                missing.join(", ")
            );
            if let Some(backup) = manager.latest_backup()?
                && confirm(
                    &format!("Restore settings from {}?", backup.name),
                    self.yes,
                )?
            {
                manager.restore_backup(&backup.path).await?;
                println!("{} Settings restored from {}", "✓".green(), backup.name);
            }
        }

        println!("\n{} Trellis {latest} is installed.", "✓".green().bold());
        Ok(())
    }
}

/// Print a notice when a newer trellis-forge release exists. Advisory
/// only; failures stay in the debug log.
async fn notify_installer_staleness() {
    let Ok(state_dir) = ForgeConfig::state_dir() else {
        return;
    };
    let checker = VersionChecker::new(state_dir);
    if let Some(latest) = checker.check_cached().await {
        eprintln!(
            "{} trellis-forge {latest} is available (you are running {})",
            "note:".cyan().bold(),
            checker.current_version()
        );
    }
}
