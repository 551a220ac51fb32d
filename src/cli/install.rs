//! The `install` command: first-time build and install.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::backup::{BackupManager, BackupOutcome};
use crate::config::ForgeConfig;
use crate::core::ForgeError;
use crate::installer::{Installer, install_update_helper, missing_tools};

use super::common::{confirm, heading};

/// Build Trellis from source and install it.
///
/// Clones the Trellis repository, checks out the newest release tag,
/// installs any missing build dependencies through the system package
/// manager, compiles and packages the application, and installs the
/// resulting package. Existing settings are backed up first, and a
/// `trellis-update` helper lands on your PATH.
#[derive(Args, Debug)]
pub struct InstallCommand {
    /// Answer yes to every prompt.
    #[arg(long, short = 'y')]
    yes: bool,

    /// Fail instead of installing missing build dependencies.
    #[arg(long)]
    skip_deps: bool,
}

impl InstallCommand {
    /// Run the install flow.
    pub async fn execute(self, config: ForgeConfig) -> Result<()> {
        heading("Installing Trellis from source");
        println!("  Repository: {}", config.source.repo_url);
        println!("  Clone dir:  {}", config.clone_dir().display());

        if !confirm("This will build and install Trellis. Continue?", self.yes)? {
            println!("Install cancelled.");
            return Ok(());
        }

        let installer = Installer::new(config.clone())?;

        let missing = missing_tools();
        if !missing.is_empty() {
            println!("Missing build tools: {}", missing.join(", "));
            if self.skip_deps
                || !confirm(
                    &format!("Install them with {}?", installer.package_manager().name()),
                    self.yes,
                )?
            {
                return Err(ForgeError::MissingBuildTools {
                    tools: missing.join(", "),
                }
                .into());
            }
            installer.ensure_dependencies(true).await?;
        }

        let repo = installer.prepare_source().await?;
        let tag = installer.checkout_latest(&repo).await?;

        // Protect whatever settings exist before the package install can
        // touch them. A failed backup warns; the user decides.
        let manager = BackupManager::new(config.backup_config());
        match manager.create_backup().await {
            Ok(BackupOutcome::Created { path, .. }) => {
                println!("{} Settings backed up to {}", "✓".green(), path.display());
            }
            Ok(BackupOutcome::NothingToBackUp) => {
                println!("No existing settings found (fresh install).");
            }
            Err(e) => {
                eprintln!("{} Settings backup failed: {e:#}", "warning:".yellow().bold());
                if !confirm("Continue without a backup?", self.yes)? {
                    anyhow::bail!("install aborted: settings backup failed");
                }
            }
        }

        let artifact = installer.rebuild(&repo).await?;
        println!("{} Installed package {}", "✓".green(), artifact.display());

        let helper = install_update_helper().await?;
        println!("{} Update helper installed at {}", "✓".green(), helper.display());

        match tag {
            Some(tag) => println!("\n{} Trellis {tag} is installed.", "✓".green().bold()),
            None => println!("\n{} Trellis is installed.", "✓".green().bold()),
        }
        Ok(())
    }
}
