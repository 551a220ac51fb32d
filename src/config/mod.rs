//! Configuration for trellis-forge.
//!
//! Settings load from `~/.config/trellis-forge/config.toml` in TOML format.
//! A missing file is not an error; every field has a default matching a
//! stock Trellis installation, so most users never create the file. The
//! location can be overridden with the `TRELLIS_FORGE_CONFIG` environment
//! variable or the global `--config` flag, which is how the integration
//! tests point the tool at throwaway directories.
//!
//! # File format
//!
//! ```toml
//! [source]
//! repo_url = "https://github.com/trellis-desktop/trellis.git"
//! clone_dir = "~/.local/share/trellis-forge/trellis"
//!
//! [settings]
//! dir = "~/.config/Trellis"
//! critical_files = ["data/agents.db"]
//! informational_files = ["auth.json", "window-state.json"]
//!
//! [backups]
//! root = "~/.local/share/trellis-forge/backups"
//! retention_limit = 5
//! ```
//!
//! Paths may use `~`, expanded at load time. The critical file list defines
//! what "settings are valid" means for verification; the informational list
//! is shown in status output but never required.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::backup::BackupConfig;
use crate::core::ForgeError;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "TRELLIS_FORGE_CONFIG";

/// Where the Trellis source comes from and where it is checked out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Git URL of the Trellis repository.
    #[serde(default = "default_repo_url")]
    pub repo_url: String,
    /// Local clone directory.
    #[serde(default = "default_clone_dir")]
    pub clone_dir: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repo_url: default_repo_url(),
            clone_dir: default_clone_dir(),
        }
    }
}

/// The live settings directory and the files that define its health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Configuration directory owned by the Trellis application.
    #[serde(default = "default_settings_dir")]
    pub dir: String,
    /// Relative paths whose presence means "settings are valid".
    #[serde(default = "default_critical_files")]
    pub critical_files: Vec<String>,
    /// Relative paths displayed in status output but never required.
    #[serde(default = "default_informational_files")]
    pub informational_files: Vec<String>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            dir: default_settings_dir(),
            critical_files: default_critical_files(),
            informational_files: default_informational_files(),
        }
    }
}

/// Backup storage location and retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Directory holding `backup-*` snapshots.
    #[serde(default = "default_backup_root")]
    pub root: String,
    /// Maximum number of backups kept. Minimum 1.
    #[serde(default = "default_retention_limit")]
    pub retention_limit: usize,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            root: default_backup_root(),
            retention_limit: default_retention_limit(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Source repository settings.
    #[serde(default)]
    pub source: SourceConfig,
    /// Live settings directory and verification lists.
    #[serde(default)]
    pub settings: SettingsConfig,
    /// Backup storage and retention.
    #[serde(default)]
    pub backups: BackupSettings,
}

impl ForgeConfig {
    /// Load configuration, resolving the path as: explicit override,
    /// `TRELLIS_FORGE_CONFIG`, then the default location. A missing file
    /// yields defaults.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => match std::env::var(CONFIG_ENV_VAR) {
                Ok(p) => PathBuf::from(p),
                Err(_) => Self::default_path()?,
            },
        };
        Self::load_from(&path).await
    }

    /// Load from a specific path; defaults if the file does not exist.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .map_err(ForgeError::from)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.backups.retention_limit == 0 {
            return Err(ForgeError::ConfigError {
                message: "backups.retention_limit must be at least 1".to_string(),
            }
            .into());
        }

        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Default config file location: `~/.config/trellis-forge/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("Could not determine config directory")?;
        Ok(base.join("trellis-forge").join("config.toml"))
    }

    /// Directory for installer-owned state (version cache), derived from
    /// the config file location.
    pub fn state_dir() -> Result<PathBuf> {
        Ok(Self::default_path()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")))
    }

    /// The settings directory with `~` expanded.
    pub fn settings_dir(&self) -> PathBuf {
        expand(&self.settings.dir)
    }

    /// The backup root with `~` expanded.
    pub fn backup_root(&self) -> PathBuf {
        expand(&self.backups.root)
    }

    /// The clone directory with `~` expanded.
    pub fn clone_dir(&self) -> PathBuf {
        expand(&self.source.clone_dir)
    }

    /// Assemble the explicit configuration the backup manager runs on.
    pub fn backup_config(&self) -> BackupConfig {
        BackupConfig {
            settings_dir: self.settings_dir(),
            backup_root: self.backup_root(),
            retention_limit: self.backups.retention_limit,
            critical_files: self
                .settings
                .critical_files
                .iter()
                .map(PathBuf::from)
                .collect(),
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn default_repo_url() -> String {
    "https://github.com/trellis-desktop/trellis.git".to_string()
}

fn default_clone_dir() -> String {
    "~/.local/share/trellis-forge/trellis".to_string()
}

fn default_settings_dir() -> String {
    "~/.config/Trellis".to_string()
}

fn default_critical_files() -> Vec<String> {
    vec!["data/agents.db".to_string()]
}

fn default_informational_files() -> Vec<String> {
    vec!["auth.json".to_string(), "window-state.json".to_string()]
}

fn default_backup_root() -> String {
    "~/.local/share/trellis-forge/backups".to_string()
}

fn default_retention_limit() -> usize {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let config = ForgeConfig::load_from(&temp.path().join("nope.toml"))
            .await
            .unwrap();
        assert_eq!(config.backups.retention_limit, 5);
        assert_eq!(config.settings.critical_files, vec!["data/agents.db"]);
    }

    #[tokio::test]
    async fn partial_file_fills_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "[backups]\nretention_limit = 2\n")
            .await
            .unwrap();

        let config = ForgeConfig::load_from(&path).await.unwrap();
        assert_eq!(config.backups.retention_limit, 2);
        assert!(config.source.repo_url.contains("trellis"));
    }

    #[tokio::test]
    async fn zero_retention_is_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        tokio::fs::write(&path, "[backups]\nretention_limit = 0\n")
            .await
            .unwrap();

        assert!(ForgeConfig::load_from(&path).await.is_err());
    }

    #[tokio::test]
    async fn save_and_reload_round_trips() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sub/config.toml");

        let mut config = ForgeConfig::default();
        config.backups.retention_limit = 9;
        config.save_to(&path).await.unwrap();

        let loaded = ForgeConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded.backups.retention_limit, 9);
    }

    #[test]
    fn backup_config_resolves_paths() {
        let mut config = ForgeConfig::default();
        config.settings.dir = "/tmp/settings".to_string();
        config.backups.root = "/tmp/backups".to_string();

        let bc = config.backup_config();
        assert_eq!(bc.settings_dir, PathBuf::from("/tmp/settings"));
        assert_eq!(bc.retention_limit, 5);
        assert_eq!(bc.critical_files, vec![PathBuf::from("data/agents.db")]);
    }
}
