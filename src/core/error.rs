//! Error handling for trellis-forge.
//!
//! The error system has two halves:
//! 1. [`ForgeError`] - strongly-typed failure cases for precise handling in code
//! 2. [`ErrorContext`] - a display wrapper that adds actionable suggestions for CLI users
//!
//! All fallible operations in the crate return result types; nothing panics in
//! library code. Commands bubble errors up as `anyhow::Error` and the binary
//! converts them with [`user_friendly_error`] just before exiting, so every
//! failure a user sees names the path, file, or command involved.
//!
//! # Example
//!
//! ```rust,no_run
//! use trellis_forge::core::{ForgeError, user_friendly_error};
//!
//! fn locate_backup() -> Result<(), ForgeError> {
//!     Err(ForgeError::BackupNotFound { path: "/tmp/backups/backup-x".into() })
//! }
//!
//! if let Err(e) = locate_backup() {
//!     let ctx = user_friendly_error(anyhow::Error::from(e));
//!     ctx.display();
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for trellis-forge operations.
///
/// Each variant represents a specific failure mode with enough context
/// (paths, commands, stderr) for a user to act manually. Variants map
/// directly onto the failure taxonomy of the install/update/backup flows:
///
/// - **Backups**: [`CopyFailed`](Self::CopyFailed),
///   [`BackupVerificationFailed`](Self::BackupVerificationFailed),
///   [`BackupNotFound`](Self::BackupNotFound),
///   [`RestoreVerificationFailed`](Self::RestoreVerificationFailed)
/// - **Versions**: [`InvalidVersion`](Self::InvalidVersion)
/// - **Git**: [`GitNotFound`](Self::GitNotFound),
///   [`GitCommandError`](Self::GitCommandError)
/// - **Build and packaging**: [`MissingBuildTools`](Self::MissingBuildTools),
///   [`BuildStepFailed`](Self::BuildStepFailed),
///   [`ArtifactNotFound`](Self::ArtifactNotFound),
///   [`PackageManagerNotFound`](Self::PackageManagerNotFound)
#[derive(Error, Debug)]
pub enum ForgeError {
    /// The recursive copy underlying a backup or restore reported failure.
    #[error("Failed to copy {from} into {to}: {reason}")]
    CopyFailed {
        /// Source directory of the copy.
        from: String,
        /// Destination directory of the copy.
        to: String,
        /// Diagnostic from the copy primitive.
        reason: String,
    },

    /// The copy nominally succeeded but critical files are absent from the
    /// backup. The backup directory is left on disk for inspection.
    #[error("Backup at {backup} failed verification: critical files are missing")]
    BackupVerificationFailed {
        /// Path of the unreliable backup attempt.
        backup: String,
    },

    /// A restore was requested against a backup path that does not exist.
    #[error("No backup found at {path}")]
    BackupNotFound {
        /// The path that was expected to hold a backup.
        path: String,
    },

    /// The restore copy completed but critical files are still missing from
    /// the settings directory.
    #[error("Settings at {settings_dir} are still missing {missing} after restore")]
    RestoreVerificationFailed {
        /// The live settings directory that was restored into.
        settings_dir: String,
        /// Comma-separated critical files that remain absent.
        missing: String,
    },

    /// A version string contained a segment that is not a non-negative integer.
    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion {
        /// The offending version string.
        input: String,
        /// Which segment was rejected and why.
        reason: String,
    },

    /// Git is not installed or not found in PATH.
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// A git command exited non-zero.
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git subcommand that failed (e.g. "clone", "fetch").
        operation: String,
        /// Captured standard error from git.
        stderr: String,
    },

    /// No supported system package manager was found on this machine.
    #[error("No supported package manager found (looked for apt-get, dnf, pacman)")]
    PackageManagerNotFound,

    /// Build tools required to compile the application are missing.
    #[error("Missing required build tools: {tools}")]
    MissingBuildTools {
        /// Comma-separated tool names.
        tools: String,
    },

    /// A build or packaging step exited non-zero.
    #[error("Build step '{step}' failed: {detail}")]
    BuildStepFailed {
        /// The step that failed (e.g. "npm ci", "electron-builder").
        step: String,
        /// Exit status or captured diagnostics.
        detail: String,
    },

    /// Packaging completed but no artifact of the expected format was found.
    #[error("No .{format} package found under {dir}")]
    ArtifactNotFound {
        /// Directory that was searched.
        dir: String,
        /// Expected package extension for this platform.
        format: String,
    },

    /// Configuration file problems that are not parse errors.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong with the configuration.
        message: String,
    },

    /// IO error from the standard library.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error when reading the config file.
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Catch-all for errors that do not fit other categories.
    #[error("{message}")]
    Other {
        /// The error message.
        message: String,
    },
}

/// User-facing error wrapper carrying optional details and a suggestion.
///
/// Commands return plain errors; the binary wraps the final error in an
/// `ErrorContext` so the terminal output pairs *what failed* with *what to
/// do about it*, in the same shape for every failure.
pub struct ErrorContext {
    /// The underlying error.
    pub error: anyhow::Error,
    /// Optional extra detail shown below the message.
    pub details: Option<String>,
    /// Optional actionable suggestion for the user.
    pub suggestion: Option<String>,
}

impl ErrorContext {
    /// Wrap an error with no details or suggestion.
    pub fn new(error: anyhow::Error) -> Self {
        Self {
            error,
            details: None,
            suggestion: None,
        }
    }

    /// Attach a detail line.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach a suggestion line.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{} {}", "error:".red().bold(), self.error);
        if let Some(details) = &self.details {
            eprintln!("  {details}");
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("{} {}", "hint:".yellow().bold(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(details) = &self.details {
            write!(f, "\n  {details}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nhint: {suggestion}")?;
        }
        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with a suggestion where one
/// is known for the failure mode.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let suggestion = match error.downcast_ref::<ForgeError>() {
        Some(ForgeError::GitNotFound) => {
            Some("Install git through your distribution's package manager".to_string())
        }
        Some(ForgeError::PackageManagerNotFound) => Some(
            "trellis-forge supports apt-get, dnf and pacman based distributions".to_string(),
        ),
        Some(ForgeError::MissingBuildTools { .. }) => {
            Some("Re-run without --skip-deps to install them automatically".to_string())
        }
        Some(ForgeError::BackupNotFound { .. }) => {
            Some("Run 'trellis-forge backup list' to see available backups".to_string())
        }
        Some(ForgeError::BackupVerificationFailed { backup }) => Some(format!(
            "Inspect the backup directory at {backup} before relying on it"
        )),
        Some(ForgeError::RestoreVerificationFailed { .. }) => Some(
            "Try restoring an older backup with 'trellis-forge backup restore --from <path>'"
                .to_string(),
        ),
        Some(ForgeError::GitCommandError { stderr, .. }) if !stderr.is_empty() => {
            Some(format!("git said: {}", stderr.trim()))
        }
        Some(ForgeError::ConfigError { .. }) => {
            Some("Check the config file syntax; delete it to fall back to defaults".to_string())
        }
        _ => None,
    };

    let mut ctx = ErrorContext::new(error);
    if let Some(s) = suggestion {
        ctx = ctx.with_suggestion(s);
    }
    ctx
}
