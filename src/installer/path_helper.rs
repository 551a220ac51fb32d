//! The `trellis-update` helper command.
//!
//! First-time installs drop a small shell script on the user's PATH so
//! "update Trellis" stays a one-word command even if trellis-forge itself
//! was run from a downloaded binary in some scratch directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, warn};

/// Name of the helper command installed on PATH.
pub const UPDATE_HELPER_NAME: &str = "trellis-update";

/// The helper script body. Delegates straight to `trellis-forge update`.
fn helper_script() -> String {
    "#!/bin/sh\n# Installed by trellis-forge. Rebuilds Trellis from the latest release tag.\nexec trellis-forge update \"$@\"\n"
        .to_string()
}

/// Directory the helper is installed into: `~/.local/bin`.
pub fn helper_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".local").join("bin"))
}

/// Write the helper script and mark it executable.
///
/// Logs a warning when `~/.local/bin` is not on PATH; the install still
/// succeeds, the user just needs to add the directory themselves.
pub async fn install_update_helper() -> Result<PathBuf> {
    let dir = helper_dir()?;
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(UPDATE_HELPER_NAME);
    fs::write(&path, helper_script())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o755);
        fs::set_permissions(&path, perms)
            .await
            .with_context(|| format!("Failed to mark {} executable", path.display()))?;
    }

    if !dir_on_path(&dir) {
        warn!(
            "{} is not on PATH; add it to your shell profile to use '{}'",
            dir.display(),
            UPDATE_HELPER_NAME
        );
    }

    debug!("Installed update helper at {}", path.display());
    Ok(path)
}

/// Whether `dir` appears in the PATH environment variable.
fn dir_on_path(dir: &std::path::Path) -> bool {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).any(|entry| entry == dir))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_delegates_to_update() {
        let script = helper_script();
        assert!(script.starts_with("#!/bin/sh"));
        assert!(script.contains("trellis-forge update"));
    }

    #[test]
    fn path_probe_matches_exact_entries() {
        // PATH is ':'-separated on Unix; an entry must match exactly.
        let dir = std::path::Path::new("/definitely/not/on/path");
        assert!(!dir_on_path(dir));
    }
}
