//! Build-dependency detection and installation.

use std::path::Path;
use std::process::Stdio;

use anyhow::Result;
use tokio::process::Command;
use tracing::{debug, info};

use crate::core::ForgeError;

/// Tools the build pipeline invokes directly.
const REQUIRED_TOOLS: [&str; 3] = ["git", "node", "npm"];

/// The system package manager used for build dependencies and for
/// installing the packaged application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemPackageManager {
    /// Debian/Ubuntu family.
    Apt,
    /// Fedora/RHEL family.
    Dnf,
    /// Arch family.
    Pacman,
}

impl SystemPackageManager {
    /// Detect the package manager by probing PATH.
    ///
    /// # Errors
    ///
    /// [`ForgeError::PackageManagerNotFound`] when none of the supported
    /// managers is present.
    pub fn detect() -> Result<Self> {
        for (binary, pm) in [
            ("apt-get", Self::Apt),
            ("dnf", Self::Dnf),
            ("pacman", Self::Pacman),
        ] {
            if which::which(binary).is_ok() {
                debug!("Detected package manager: {binary}");
                return Ok(pm);
            }
        }
        Err(ForgeError::PackageManagerNotFound.into())
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Pacman => "pacman",
        }
    }

    /// Package file extension this platform's packager produces.
    pub fn artifact_extension(&self) -> &'static str {
        match self {
            Self::Apt => "deb",
            Self::Dnf => "rpm",
            Self::Pacman => "pkg.tar.zst",
        }
    }

    /// The electron-builder `--linux` target for this platform.
    pub fn builder_target(&self) -> &'static str {
        match self {
            Self::Apt => "deb",
            Self::Dnf => "rpm",
            Self::Pacman => "pacman",
        }
    }

    /// Distribution packages providing the required build tools.
    pub fn build_packages(&self) -> &'static [&'static str] {
        match self {
            Self::Apt => &["git", "nodejs", "npm", "fakeroot", "dpkg"],
            Self::Dnf => &["git", "nodejs", "npm", "rpm-build"],
            Self::Pacman => &["git", "nodejs", "npm", "base-devel"],
        }
    }

    /// Install distribution packages under sudo, streaming the manager's
    /// own output to the terminal.
    pub async fn install_packages(&self, packages: &[&str]) -> Result<()> {
        info!("Installing packages with {}: {}", self.name(), packages.join(" "));

        let mut args: Vec<&str> = match self {
            Self::Apt => vec!["apt-get", "install", "-y"],
            Self::Dnf => vec!["dnf", "install", "-y"],
            Self::Pacman => vec!["pacman", "-S", "--noconfirm", "--needed"],
        };
        args.extend_from_slice(packages);

        run_privileged("install dependencies", &args).await
    }

    /// Install a locally built package file.
    pub async fn install_artifact(&self, artifact: &Path) -> Result<()> {
        info!("Installing package {}", artifact.display());
        let artifact = artifact.display().to_string();

        let args: Vec<&str> = match self {
            Self::Apt => vec!["apt-get", "install", "-y", "--reinstall", artifact.as_str()],
            Self::Dnf => vec!["dnf", "install", "-y", artifact.as_str()],
            Self::Pacman => vec!["pacman", "-U", "--noconfirm", artifact.as_str()],
        };

        run_privileged("install package", &args).await
    }
}

/// Run a package-manager command through sudo with inherited stdio.
async fn run_privileged(step: &str, args: &[&str]) -> Result<()> {
    debug!("Running: sudo {}", args.join(" "));
    let status = Command::new("sudo")
        .args(args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(ForgeError::from)?;

    if !status.success() {
        return Err(ForgeError::BuildStepFailed {
            step: step.to_string(),
            detail: format!("sudo {} exited with {}", args.join(" "), status),
        }
        .into());
    }
    Ok(())
}

/// Which of the required build tools are not on PATH.
pub fn missing_tools() -> Vec<&'static str> {
    REQUIRED_TOOLS
        .iter()
        .filter(|tool| which::which(tool).is_err())
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_extension_matches_manager() {
        assert_eq!(SystemPackageManager::Apt.artifact_extension(), "deb");
        assert_eq!(SystemPackageManager::Dnf.artifact_extension(), "rpm");
        assert_eq!(
            SystemPackageManager::Pacman.artifact_extension(),
            "pkg.tar.zst"
        );
    }

    #[test]
    fn build_packages_include_node_toolchain() {
        for pm in [
            SystemPackageManager::Apt,
            SystemPackageManager::Dnf,
            SystemPackageManager::Pacman,
        ] {
            assert!(pm.build_packages().contains(&"npm"));
            assert!(pm.build_packages().contains(&"git"));
        }
    }
}
