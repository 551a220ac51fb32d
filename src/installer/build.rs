//! Compile and package the Trellis source tree.
//!
//! The pipeline is three shell-outs: `npm ci` (falling back to
//! `npm install` when there is no lockfile), `npm run dist` with the
//! platform's electron-builder target, and finally handing the produced
//! package file to the system package manager. Build output streams
//! straight to the terminal; the build tools' own progress reporting is
//! better than anything we could summarize.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Result;
use tokio::process::Command;
use tracing::{debug, info};

use crate::core::ForgeError;

use super::deps::SystemPackageManager;

/// Builds the application from a checked-out source tree.
pub struct BuildPipeline<'a> {
    source_dir: &'a Path,
    package_manager: SystemPackageManager,
}

impl<'a> BuildPipeline<'a> {
    /// Pipeline over `source_dir`, packaging for `package_manager`.
    pub fn new(source_dir: &'a Path, package_manager: SystemPackageManager) -> Self {
        Self {
            source_dir,
            package_manager,
        }
    }

    /// Install JS dependencies, build, package, and return the artifact path.
    pub async fn build(&self) -> Result<PathBuf> {
        self.install_js_dependencies().await?;
        self.package().await?;
        self.find_artifact()
    }

    async fn install_js_dependencies(&self) -> Result<()> {
        // npm ci needs a lockfile; fall back for source trees without one.
        if self.source_dir.join("package-lock.json").exists() {
            self.run_step("npm ci", "npm", &["ci"]).await
        } else {
            self.run_step("npm install", "npm", &["install"]).await
        }
    }

    async fn package(&self) -> Result<()> {
        let target = self.package_manager.builder_target();
        info!("Packaging for {target}");
        self.run_step(
            "npm run dist",
            "npm",
            &["run", "dist", "--", "--linux", target],
        )
        .await
    }

    /// Newest file under `dist/` with the platform's package extension.
    fn find_artifact(&self) -> Result<PathBuf> {
        let dist = self.source_dir.join("dist");
        let extension = self.package_manager.artifact_extension();

        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        if dist.is_dir() {
            for entry in std::fs::read_dir(&dist).map_err(ForgeError::from)? {
                let entry = entry.map_err(ForgeError::from)?;
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();
                if !path.is_file() || !name.ends_with(&format!(".{extension}")) {
                    continue;
                }
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                let newer = match &newest {
                    None => true,
                    Some((best, _)) => modified > *best,
                };
                if newer {
                    newest = Some((modified, path));
                }
            }
        }

        newest.map(|(_, path)| path).ok_or_else(|| {
            ForgeError::ArtifactNotFound {
                dir: dist.display().to_string(),
                format: extension.to_string(),
            }
            .into()
        })
    }

    /// Install the built package with the system package manager.
    pub async fn install_artifact(&self, artifact: &Path) -> Result<()> {
        self.package_manager.install_artifact(artifact).await
    }

    async fn run_step(&self, step: &str, program: &str, args: &[&str]) -> Result<()> {
        debug!("Running {program} {} in {}", args.join(" "), self.source_dir.display());
        let status = Command::new(program)
            .args(args)
            .current_dir(self.source_dir)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(ForgeError::from)?;

        if !status.success() {
            return Err(ForgeError::BuildStepFailed {
                step: step.to_string(),
                detail: format!("exited with {status}"),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn find_artifact_picks_matching_extension() {
        let temp = TempDir::new().unwrap();
        let dist = temp.path().join("dist");
        std::fs::create_dir_all(&dist).unwrap();
        std::fs::write(dist.join("trellis-1.4.0.deb"), "deb").unwrap();
        std::fs::write(dist.join("trellis-1.4.0.AppImage"), "appimage").unwrap();

        let pipeline = BuildPipeline::new(temp.path(), SystemPackageManager::Apt);
        let artifact = pipeline.find_artifact().unwrap();
        assert!(artifact.to_string_lossy().ends_with(".deb"));
    }

    #[test]
    fn find_artifact_errors_when_empty() {
        let temp = TempDir::new().unwrap();
        let pipeline = BuildPipeline::new(temp.path(), SystemPackageManager::Apt);
        let err = pipeline.find_artifact().unwrap_err();
        let forge = err.downcast_ref::<ForgeError>().unwrap();
        assert!(matches!(forge, ForgeError::ArtifactNotFound { .. }));
    }
}
