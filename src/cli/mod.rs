//! Command-line interface for trellis-forge.
//!
//! Each command lives in its own module with its own argument structure
//! and `execute` method; this module owns the clap surface, the global
//! flags, and the translation of those flags into a [`CliConfig`] that can
//! be injected in tests without touching process state.
//!
//! # Commands
//!
//! - `install` - clone, build, package and install Trellis
//! - `update` - rebuild when a newer release tag exists
//! - `backup` - create / list / restore / check settings backups
//! - `status` - versions, settings health, backup inventory
//!
//! # Global options
//!
//! - `--verbose` / `--quiet` - logging verbosity
//! - `--config` - alternate config file (also `TRELLIS_FORGE_CONFIG`)

mod backup;
pub mod common;
mod install;
mod status;
mod update;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::ForgeConfig;

/// Resolved configuration derived from the global CLI flags.
///
/// Separated from [`Cli`] so tests can drive command execution with a
/// known configuration instead of parsing argv.
#[derive(Debug, Default, Clone)]
pub struct CliConfig {
    /// Log filter for `tracing-subscriber`; `None` disables logging.
    pub log_level: Option<String>,
    /// Alternate config file path.
    pub config_path: Option<PathBuf>,
}

/// Installer and updater for the Trellis desktop application.
#[derive(Parser)]
#[command(name = "trellis-forge", version, about, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress log output.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to an alternate config file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build Trellis from source and install it.
    Install(install::InstallCommand),

    /// Update Trellis to the newest release tag.
    Update(update::UpdateCommand),

    /// Manage settings backups.
    Backup(backup::BackupCommand),

    /// Show versions, settings health and backups.
    Status(status::StatusCommand),
}

impl Cli {
    /// Execute with configuration derived from the parsed flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("warn".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Execute with an explicit configuration.
    pub async fn execute_with_config(self, cli_config: CliConfig) -> Result<()> {
        init_tracing(&cli_config);

        let config = ForgeConfig::load_with_optional(cli_config.config_path).await?;

        match self.command {
            Commands::Install(cmd) => cmd.execute(config).await,
            Commands::Update(cmd) => cmd.execute(config).await,
            Commands::Backup(cmd) => cmd.execute(config).await,
            Commands::Status(cmd) => cmd.execute(config).await,
        }
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the flag-derived
/// level; `--quiet` installs nothing, which silences the macros.
fn init_tracing(config: &CliConfig) {
    let Some(level) = &config.log_level else {
        return;
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.clone()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_maps_to_debug() {
        let cli = Cli::parse_from(["trellis-forge", "--verbose", "status"]);
        assert_eq!(cli.build_config().log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn quiet_disables_logging() {
        let cli = Cli::parse_from(["trellis-forge", "--quiet", "status"]);
        assert_eq!(cli.build_config().log_level, None);
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from([
            "trellis-forge",
            "backup",
            "list",
            "--config",
            "/tmp/alt.toml",
        ]);
        assert_eq!(
            cli.build_config().config_path,
            Some(PathBuf::from("/tmp/alt.toml"))
        );
    }
}
