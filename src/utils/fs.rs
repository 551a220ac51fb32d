//! File system helpers shared by the backup and installer layers.
//!
//! The recursive copy here is the bulk-copy primitive the backup manager is
//! built on: it overlays the destination (existing files not present in the
//! source are left alone), creates directories as needed, and skips symlinks
//! and special files.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Create a directory and all parent directories. Idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("Path exists but is not a directory: {}", path.display());
        }
        return Ok(());
    }
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))
}

/// Recursively copy the contents of `src` into `dst`.
///
/// Overlay semantics: `dst` is created if needed, files already present in
/// `dst` but absent from `src` are untouched, and files present in both are
/// overwritten. Symlinks and special files are skipped.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    ensure_dir(dst)?;

    for entry in
        fs::read_dir(src).with_context(|| format!("Failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            copy_dir(&src_path, &dst_path)?;
        } else if file_type.is_file() {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "Failed to copy file from {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
        // Skip symlinks and other file types
    }

    Ok(())
}

/// Remove a directory tree. No error if the directory does not exist.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Size of a regular file in bytes, `None` if the path does not exist.
pub fn file_size(path: &Path) -> Result<Option<u64>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to stat {}", path.display())),
    }
}

/// Total size in bytes of all regular files under `path`.
pub fn dir_size(path: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in
        fs::read_dir(path).with_context(|| format!("Failed to read {}", path.display()))?
    {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            total += dir_size(&entry.path())?;
        } else if file_type.is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Render a byte count for terminal output (e.g. "1.4 MiB").
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("a/b/c");
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
        // Idempotent
        ensure_dir(&dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_on_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "content").unwrap();
        assert!(ensure_dir(&file).is_err());
    }

    #[test]
    fn test_copy_dir_recursive() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("data")).unwrap();
        fs::write(src.join("top.txt"), "top").unwrap();
        fs::write(src.join("data/agents.db"), "db").unwrap();

        let dst = temp.path().join("dst");
        copy_dir(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("top.txt")).unwrap(), "top");
        assert_eq!(
            fs::read_to_string(dst.join("data/agents.db")).unwrap(),
            "db"
        );
    }

    #[test]
    fn test_copy_dir_overlays_destination() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("new.txt"), "new").unwrap();
        fs::write(dst.join("stale.txt"), "stale").unwrap();

        copy_dir(&src, &dst).unwrap();

        // Files already in the destination survive an overlay copy.
        assert!(dst.join("stale.txt").exists());
        assert!(dst.join("new.txt").exists());
    }

    #[test]
    fn test_file_size() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("f");
        fs::write(&file, [0u8; 500]).unwrap();
        assert_eq!(file_size(&file).unwrap(), Some(500));
        assert_eq!(file_size(&temp.path().join("missing")).unwrap(), None);
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(500), "500 B");
        assert_eq!(human_size(2048), "2.0 KiB");
    }
}
