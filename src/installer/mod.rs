//! Install and update orchestration.
//!
//! Everything here is a building block: the CLI commands sequence these
//! steps and own every interactive decision. The blocks themselves never
//! prompt; where a flow needs a human choice (a dirty working tree, a
//! failed pre-update backup) the state is returned as a value and the
//! chosen [`WorkingTreeAction`] comes back in.
//!
//! The install flow is: ensure dependencies, clone or refresh the source,
//! check out the newest release tag, back up settings, build and package,
//! install the package, drop the `trellis-update` helper on PATH. The
//! update flow is the same minus the first-time pieces, gated on the
//! version reconciler saying the checked-out tag is stale.

pub mod build;
pub mod deps;
pub mod path_helper;

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::ForgeConfig;
use crate::core::ForgeError;
use crate::git::{GitCommand, GitRepo, ensure_git_available};
use crate::version::{VersionReconciler, compare_versions};

pub use build::BuildPipeline;
pub use deps::{SystemPackageManager, missing_tools};
pub use path_helper::{UPDATE_HELPER_NAME, install_update_helper};

/// What to do about a dirty working tree before rebuilding.
///
/// Decided by the CLI layer (interactively or via flags) and passed back
/// into the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingTreeAction {
    /// Build on top of the local modifications.
    Proceed,
    /// Stash local modifications first.
    Stash,
    /// Stop without touching anything.
    Abort,
}

/// Result of reconciling the local checkout against available tags.
#[derive(Debug)]
pub struct UpdateCheck {
    /// Tag the checkout currently sits on, if any.
    pub installed: Option<String>,
    /// Newest parsable tag in the repository, if any.
    pub latest: Option<String>,
    /// Whether a rebuild would change the installed version.
    pub update_available: bool,
    /// Whether the working tree has local modifications.
    pub dirty: bool,
}

/// Sequenced building blocks for the install and update flows.
pub struct Installer {
    config: ForgeConfig,
    package_manager: SystemPackageManager,
}

impl Installer {
    /// Create an installer, detecting the system package manager.
    pub fn new(config: ForgeConfig) -> Result<Self> {
        let package_manager = SystemPackageManager::detect()?;
        Ok(Self {
            config,
            package_manager,
        })
    }

    /// The detected package manager.
    pub fn package_manager(&self) -> SystemPackageManager {
        self.package_manager
    }

    /// The configuration driving this installer.
    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// Verify required build tools, installing the distribution packages
    /// that provide them when `auto_install` is set.
    ///
    /// # Errors
    ///
    /// [`ForgeError::MissingBuildTools`] when tools are missing and
    /// `auto_install` is false, or when they are still missing after an
    /// install attempt.
    pub async fn ensure_dependencies(&self, auto_install: bool) -> Result<()> {
        let missing = missing_tools();
        if missing.is_empty() {
            debug!("All build tools present");
            return Ok(());
        }

        if !auto_install {
            return Err(ForgeError::MissingBuildTools {
                tools: missing.join(", "),
            }
            .into());
        }

        info!("Installing build dependencies for: {}", missing.join(", "));
        self.package_manager
            .install_packages(self.package_manager.build_packages())
            .await?;

        let still_missing = missing_tools();
        if !still_missing.is_empty() {
            return Err(ForgeError::MissingBuildTools {
                tools: still_missing.join(", "),
            }
            .into());
        }
        Ok(())
    }

    /// Clone the source repository, or fetch if a clone already exists.
    pub async fn prepare_source(&self) -> Result<GitRepo> {
        ensure_git_available()?;

        let clone_dir = self.config.clone_dir();
        if clone_dir.join(".git").exists() {
            info!("Refreshing existing clone at {}", clone_dir.display());
            let repo = GitRepo::new(&clone_dir);
            repo.fetch().await?;
            return Ok(repo);
        }

        if let Some(parent) = clone_dir.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ForgeError::from)?;
        }

        info!(
            "Cloning {} into {}",
            self.config.source.repo_url,
            clone_dir.display()
        );
        GitCommand::clone(&self.config.source.repo_url, &clone_dir)
            .passthrough()
            .execute_success()
            .await?;
        Ok(GitRepo::new(&clone_dir))
    }

    /// Reconcile the checkout against the repository's tags.
    pub async fn check_update(&self, repo: &GitRepo) -> Result<UpdateCheck> {
        let tags = repo.tags().await?;
        let installed = repo.current_tag().await?;
        let latest = VersionReconciler::latest(&tags).cloned();
        let dirty = repo.is_dirty().await?;

        let update_available = match (&installed, &latest) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(installed), Some(latest)) => {
                match compare_versions(installed, latest) {
                    Ok(ordering) => ordering == std::cmp::Ordering::Less,
                    // An unparsable checked-out tag cannot be reconciled;
                    // treat any difference as an update.
                    Err(e) => {
                        warn!("Could not compare '{installed}' with '{latest}': {e}");
                        installed != latest
                    }
                }
            }
        };

        Ok(UpdateCheck {
            installed,
            latest,
            update_available,
            dirty,
        })
    }

    /// Check out the newest release tag, returning it, or `None` when the
    /// repository has no parsable tags (the default branch is used as-is).
    pub async fn checkout_latest(&self, repo: &GitRepo) -> Result<Option<String>> {
        let tags = repo.tags().await?;
        match VersionReconciler::latest(&tags) {
            Some(tag) => {
                info!("Checking out {tag}");
                repo.checkout(tag).await?;
                Ok(Some(tag.clone()))
            }
            None => {
                debug!("No release tags found, building the default branch");
                Ok(None)
            }
        }
    }

    /// Build, package and install the application from the checkout.
    ///
    /// Returns the path of the installed package artifact.
    pub async fn rebuild(&self, repo: &GitRepo) -> Result<PathBuf> {
        let pipeline = BuildPipeline::new(repo.path(), self.package_manager);
        let artifact = pipeline.build().await?;
        pipeline.install_artifact(&artifact).await?;
        Ok(artifact)
    }
}
