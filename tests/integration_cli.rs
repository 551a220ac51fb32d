//! Binary-level tests for the trellis-forge CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Write a config file pointing every path at the temp directory and
/// return its path.
fn write_config(temp: &TempDir) -> std::path::PathBuf {
    let config_path = temp.path().join("config.toml");
    let contents = format!(
        r#"
[source]
clone_dir = "{base}/clone"

[settings]
dir = "{base}/settings"

[backups]
root = "{base}/backups"
retention_limit = 5
"#,
        base = temp.path().display()
    );
    std::fs::write(&config_path, contents).unwrap();
    config_path
}

fn forge() -> Command {
    let mut cmd = Command::cargo_bin("trellis-forge").unwrap();
    // Keep the suite hermetic even if the host has a real config.
    cmd.env_remove("TRELLIS_FORGE_CONFIG");
    cmd
}

#[test]
fn help_lists_commands() {
    forge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn version_flag_prints_version() {
    forge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn backup_list_on_fresh_config_is_empty_and_succeeds() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);

    forge()
        .args(["--config"])
        .arg(&config)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found"));
}

#[test]
fn backup_create_without_settings_reports_nothing_to_back_up() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);

    forge()
        .args(["--config"])
        .arg(&config)
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to back up"));
}

#[test]
fn backup_create_then_list_shows_the_snapshot() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    let settings = temp.path().join("settings");
    std::fs::create_dir_all(settings.join("data")).unwrap();
    std::fs::write(settings.join("data/agents.db"), [0u8; 500]).unwrap();

    forge()
        .args(["--config"])
        .arg(&config)
        .args(["backup", "create"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup created"));

    forge()
        .args(["--config"])
        .arg(&config)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backup-"));
}

#[test]
fn restore_with_no_backups_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);

    forge()
        .args(["--config"])
        .arg(&config)
        .args(["backup", "restore", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no backups available"));
}

#[test]
fn config_env_var_is_honored() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);

    let mut cmd = Command::cargo_bin("trellis-forge").unwrap();
    cmd.env("TRELLIS_FORGE_CONFIG", &config)
        .args(["backup", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found"));
}

#[test]
fn zero_retention_config_is_rejected() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("config.toml");
    std::fs::write(&config_path, "[backups]\nretention_limit = 0\n").unwrap();

    forge()
        .args(["--config"])
        .arg(&config_path)
        .args(["backup", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("retention_limit"));
}

#[test]
fn backup_check_reports_missing_critical_file() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    std::fs::create_dir_all(temp.path().join("settings")).unwrap();

    forge()
        .args(["--config"])
        .arg(&config)
        .args(["backup", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("data/agents.db"))
        .stdout(predicate::str::contains("missing"));
}
