//! End-to-end CLI tests for the download-provider binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated from the user's config and database.
fn cli(temp_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("download-provider").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp_dir.join("config"))
        .env_remove("RUST_LOG")
        .arg("--db")
        .arg(temp_dir.join("downloads.db"));
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("download-provider").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Track background downloads"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("download-provider").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("download-provider"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("download-provider").unwrap();
    cmd.arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that a subcommand is required.
#[test]
fn test_binary_without_subcommand_fails() {
    let mut cmd = Command::cargo_bin("download-provider").unwrap();
    cmd.assert().failure();
}

#[test]
fn test_query_roots_lists_single_root() {
    let temp_dir = TempDir::new().unwrap();
    cli(temp_dir.path())
        .args(["query", "roots"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"root_id\": \"downloads\""));
}

#[test]
fn test_add_then_query_lists_download() {
    let temp_dir = TempDir::new().unwrap();
    cli(temp_dir.path())
        .args(["add", "https://example.com/files/report.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": 1"));

    cli(temp_dir.path())
        .args(["query", "roots/downloads"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"display_name\": \"report.pdf\""))
        .stdout(predicate::str::contains("\"summary\": \"Queued\""));
}

#[test]
fn test_add_rejects_malformed_uri() {
    let temp_dir = TempDir::new().unwrap();
    cli(temp_dir.path())
        .args(["add", "not a uri"])
        .assert()
        .failure();
}

#[test]
fn test_complete_then_cat_prints_payload() {
    let temp_dir = TempDir::new().unwrap();
    let payload = temp_dir.path().join("payload.txt");
    std::fs::write(&payload, "payload body").unwrap();

    cli(temp_dir.path())
        .args(["add", "https://example.com/payload.txt"])
        .assert()
        .success();
    cli(temp_dir.path())
        .args(["complete", "1", "--path"])
        .arg(&payload)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_bytes\": 12"));

    cli(temp_dir.path())
        .args(["cat", "roots/downloads/docs/id:1/contents"])
        .assert()
        .success()
        .stdout("payload body");
}

#[test]
fn test_offline_tick_blocks_new_download() {
    let temp_dir = TempDir::new().unwrap();
    cli(temp_dir.path())
        .args(["add", "https://example.com/a"])
        .assert()
        .success();

    cli(temp_dir.path())
        .args(["--offline", "tick"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"to_start\": []"));

    cli(temp_dir.path())
        .args(["check", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ready\": true"));
}

#[test]
fn test_delete_malformed_document_id_fails() {
    let temp_dir = TempDir::new().unwrap();
    cli(temp_dir.path())
        .args(["delete", "roots/downloads/docs/id:abc"])
        .assert()
        .failure();
}

#[test]
fn test_explicit_config_file_sets_labels() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("custom.toml");
    std::fs::write(&config, "label_queued = \"Waiting\"\n").unwrap();

    cli(temp_dir.path())
        .args(["add", "https://example.com/a"])
        .assert()
        .success();
    cli(temp_dir.path())
        .arg("--config")
        .arg(&config)
        .args(["query", "roots/downloads"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"summary\": \"Waiting\""));
}

#[test]
fn test_completion_notice_not_repeated_across_ticks() {
    let temp_dir = TempDir::new().unwrap();
    let payload = temp_dir.path().join("payload.txt");
    std::fs::write(&payload, "body").unwrap();

    cli(temp_dir.path())
        .args(["add", "https://example.com/a", "--visibility", "notify"])
        .assert()
        .success();
    cli(temp_dir.path())
        .args(["complete", "1", "--path"])
        .arg(&payload)
        .assert()
        .success();

    cli(temp_dir.path())
        .arg("tick")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"notified\": []").not());
    cli(temp_dir.path())
        .arg("tick")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"notified\": []"));
}

#[test]
fn test_fail_rejects_unparseable_retry_after() {
    let temp_dir = TempDir::new().unwrap();
    cli(temp_dir.path())
        .args(["add", "https://example.com/a"])
        .assert()
        .success();
    cli(temp_dir.path())
        .args(["fail", "1", "--retry-after", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected seconds or an HTTP-date"));
}
