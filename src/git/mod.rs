//! Git operations wrapper.
//!
//! trellis-forge drives the system `git` binary rather than an embedded Git
//! library, the same way Cargo does with `git-fetch-with-cli`: the user's
//! existing authentication (SSH agents, credential helpers) and proxy
//! configuration just work, and failures can be reproduced by pasting the
//! logged command into a shell.
//!
//! [`GitCommand`] builds argument lists (never shell strings), runs the
//! command through `tokio::process`, and maps non-zero exits to
//! [`ForgeError::GitCommandError`] with the captured stderr. [`GitRepo`]
//! layers the handful of repository questions the installer asks: current
//! tag, tag list, dirty state.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

use crate::core::ForgeError;

/// Resolve the git binary, honoring a `TRELLIS_FORGE_GIT` override.
fn git_binary() -> String {
    std::env::var("TRELLIS_FORGE_GIT").unwrap_or_else(|_| "git".to_string())
}

/// Fail fast if git is not installed.
pub fn ensure_git_available() -> Result<()> {
    which::which(git_binary())
        .map(|_| ())
        .map_err(|_| ForgeError::GitNotFound.into())
}

/// Builder for a single git invocation.
pub struct GitCommand {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    capture_output: bool,
}

/// Captured output of a successful git command.
#[derive(Debug)]
pub struct GitCommandOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error (git writes progress here even on success).
    pub stderr: String,
}

impl GitCommand {
    /// Start an empty command.
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            capture_output: true,
        }
    }

    /// Run inside `dir` via `git -C <dir>`, independent of the process cwd.
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Append a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Let the child inherit stdout/stderr. Used for long operations
    /// (clone, fetch) where git's own progress output is the best UI.
    #[must_use]
    pub fn passthrough(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Execute and return captured output.
    ///
    /// # Errors
    ///
    /// [`ForgeError::GitCommandError`] on non-zero exit, carrying the git
    /// subcommand name and stderr.
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let git = git_binary();
        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.clone());

        debug!(target: "git", "Executing: {} {}", git, full_args.join(" "));

        let mut cmd = Command::new(&git);
        cmd.args(&full_args);
        if self.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to execute git {}", full_args.join(" ")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            // The operation is the first real subcommand, past any -C pair.
            let operation = if full_args.first().map(String::as_str) == Some("-C") {
                full_args.get(2)
            } else {
                full_args.first()
            }
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

            debug!(target: "git", "git {} failed: {}", operation, stderr.trim());
            return Err(ForgeError::GitCommandError {
                operation,
                stderr: stderr.trim().to_string(),
            }
            .into());
        }

        Ok(GitCommandOutput { stdout, stderr })
    }

    /// Execute and return trimmed stdout.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute, discarding output.
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }

    // Convenience builders for the operations the installer uses.

    /// `git clone <url> <target>` with submodules.
    pub fn clone(url: &str, target: impl AsRef<Path>) -> Self {
        Self::new()
            .args(["clone", "--recurse-submodules", url])
            .arg(target.as_ref().display().to_string())
    }

    /// `git fetch --all --tags --force`.
    pub fn fetch() -> Self {
        Self::new().args(["fetch", "--all", "--tags", "--force"])
    }

    /// `git tag -l`.
    pub fn list_tags() -> Self {
        Self::new().args(["tag", "-l"])
    }

    /// `git describe --tags --exact-match HEAD`.
    pub fn describe_exact_tag() -> Self {
        Self::new().args(["describe", "--tags", "--exact-match", "HEAD"])
    }

    /// `git status --porcelain`.
    pub fn status_porcelain() -> Self {
        Self::new().args(["status", "--porcelain"])
    }

    /// `git stash push -m <message>`, including untracked files.
    pub fn stash_push(message: &str) -> Self {
        Self::new().args(["stash", "push", "--include-untracked", "-m", message])
    }

    /// `git checkout <ref>`.
    pub fn checkout(ref_name: &str) -> Self {
        Self::new().args(["checkout", ref_name])
    }
}

impl Default for GitCommand {
    fn default() -> Self {
        Self::new()
    }
}

/// A local clone of the Trellis repository.
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    /// Wrap an existing checkout directory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Checkout directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the working tree has uncommitted or untracked changes.
    pub async fn is_dirty(&self) -> Result<bool> {
        let status = GitCommand::status_porcelain()
            .current_dir(&self.path)
            .execute_stdout()
            .await?;
        Ok(!status.is_empty())
    }

    /// The tag HEAD currently sits on, or `None` when HEAD is untagged.
    pub async fn current_tag(&self) -> Result<Option<String>> {
        match GitCommand::describe_exact_tag()
            .current_dir(&self.path)
            .execute_stdout()
            .await
        {
            Ok(tag) if !tag.is_empty() => Ok(Some(tag)),
            Ok(_) => Ok(None),
            // describe exits non-zero when HEAD carries no tag; that is an
            // answer, not a failure.
            Err(e) if e.downcast_ref::<ForgeError>().is_some_and(|f| {
                matches!(f, ForgeError::GitCommandError { .. })
            }) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// All tags known to the local clone.
    pub async fn tags(&self) -> Result<Vec<String>> {
        let raw = GitCommand::list_tags()
            .current_dir(&self.path)
            .execute_stdout()
            .await?;
        Ok(raw.lines().map(str::to_string).collect())
    }

    /// Fetch branches and tags from origin.
    pub async fn fetch(&self) -> Result<()> {
        GitCommand::fetch()
            .current_dir(&self.path)
            .execute_success()
            .await
    }

    /// Stash local modifications, including untracked files.
    pub async fn stash(&self, message: &str) -> Result<()> {
        GitCommand::stash_push(message)
            .current_dir(&self.path)
            .execute_success()
            .await
    }

    /// Check out a tag or branch.
    pub async fn checkout(&self, ref_name: &str) -> Result<()> {
        GitCommand::checkout(ref_name)
            .current_dir(&self.path)
            .execute_success()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn init_repo(dir: &Path) {
        GitCommand::new()
            .current_dir(dir)
            .args(["init", "-q"])
            .execute_success()
            .await
            .unwrap();
        GitCommand::new()
            .current_dir(dir)
            .args(["config", "user.email", "test@example.com"])
            .execute_success()
            .await
            .unwrap();
        GitCommand::new()
            .current_dir(dir)
            .args(["config", "user.name", "Test"])
            .execute_success()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_command_carries_operation_and_stderr() {
        let temp = TempDir::new().unwrap();
        let err = GitCommand::new()
            .current_dir(temp.path())
            .args(["rev-parse", "HEAD"])
            .execute()
            .await
            .unwrap_err();
        let forge = err.downcast_ref::<ForgeError>().unwrap();
        match forge {
            ForgeError::GitCommandError { operation, stderr } => {
                assert_eq!(operation, "rev-parse");
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn dirty_and_tag_detection() {
        let temp = TempDir::new().unwrap();
        init_repo(temp.path()).await;
        let repo = GitRepo::new(temp.path());

        assert!(!repo.is_dirty().await.unwrap());
        assert_eq!(repo.current_tag().await.unwrap(), None);

        std::fs::write(temp.path().join("file.txt"), "x").unwrap();
        assert!(repo.is_dirty().await.unwrap());

        GitCommand::new()
            .current_dir(temp.path())
            .args(["add", "."])
            .execute_success()
            .await
            .unwrap();
        GitCommand::new()
            .current_dir(temp.path())
            .args(["commit", "-q", "-m", "initial"])
            .execute_success()
            .await
            .unwrap();
        GitCommand::new()
            .current_dir(temp.path())
            .args(["tag", "v1.2.0"])
            .execute_success()
            .await
            .unwrap();

        assert_eq!(repo.current_tag().await.unwrap(), Some("v1.2.0".to_string()));
        assert_eq!(repo.tags().await.unwrap(), vec!["v1.2.0".to_string()]);
    }
}
