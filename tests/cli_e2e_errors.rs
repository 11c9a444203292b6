//! End-to-end tests for configuration handling and error reporting.
//!
//! Failures must exit non-zero with a message that names the problem and,
//! where there is an obvious remedy, a `hint:` line.

#[allow(dead_code)]
mod common;
use common::prelude::*;

#[test]
fn test_missing_config() {
    TestFixture::new()
        .command()
        .arg("ls")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"))
        .stderr(predicate::str::contains("RESOURCE_REPO_CONFIG"));
}

#[test]
fn test_config_from_environment() {
    let fixture = TestFixture::new()
        .with_file("elsewhere/repo.yaml", configs::FILESYSTEM)
        .with_file("elsewhere/data/a.txt", "alpha");
    fixture
        .command()
        .env("RESOURCE_REPO_CONFIG", fixture.path().join("elsewhere/repo.yaml"))
        .args(["cat", "a.txt"])
        .assert()
        .success()
        .stdout("alpha");
}

#[test]
fn test_config_flag() {
    let fixture = TestFixture::new()
        .with_file("custom.yaml", configs::FILESYSTEM)
        .with_file("data/a.txt", "alpha");
    fixture
        .command()
        .args(["--config", "custom.yaml", "cat", "a.txt"])
        .assert()
        .success()
        .stdout("alpha");
}

#[test]
fn test_invalid_yaml() {
    TestFixture::new()
        .with_config(configs::INVALID_YAML)
        .command()
        .arg("ls")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_unknown_backend_suggests_kind() {
    TestFixture::new()
        .with_config(configs::UNKNOWN_BACKEND)
        .command()
        .arg("ls")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown backend kind: filesytem"))
        .stderr(predicate::str::contains("Did you mean 'filesystem'?"));
}

#[test]
fn test_read_only_rejects_writes() {
    let fixture = TestFixture::new()
        .with_config(configs::READ_ONLY)
        .with_file("data/a.txt", "alpha");

    fixture
        .command()
        .args(["put", "a.txt"])
        .write_stdin("changed")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Forbidden"))
        .stderr(predicate::str::contains("read_only"));
    fixture.child("data/a.txt").assert("alpha");

    fixture
        .command()
        .args(["rm", "missing.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Resource not found"));

    fixture
        .command()
        .args(["cat", "a.txt"])
        .assert()
        .success()
        .stdout("alpha");
}

#[test]
fn test_log_level_debug_reports_open() {
    TestFixture::new()
        .with_config(configs::FILESYSTEM)
        .with_dir("data")
        .command()
        .args(["--log-level", "debug", "ls"])
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(predicate::str::contains("opened repository rooted at"));
}

#[test]
fn test_exit_code_usage_error() {
    TestFixture::new()
        .command()
        .arg("frobnicate")
        .assert()
        .code(2);
}

#[test]
fn test_version() {
    TestFixture::new()
        .command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("resource-repo"));
}
