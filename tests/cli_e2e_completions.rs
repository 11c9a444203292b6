//! End-to-end tests for the `resource-repo completions` command.

#[allow(dead_code)]
mod common;
use common::prelude::*;

#[test]
fn test_completions_bash_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("resource-repo");
    let assert = cmd.args(["completions", "bash"]).assert().success();
    let script = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    assert!(script.contains("_resource-repo()"));
    for subcommand in [
        "ls", "tree", "cat", "put", "mkdir", "rm", "describe", "alter", "cp", "mv",
    ] {
        assert!(
            script.contains(subcommand),
            "bash completions miss '{}'",
            subcommand
        );
    }
}

#[test]
fn test_completions_zsh_and_fish() {
    cargo_bin_cmd!("resource-repo")
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef resource-repo"));

    cargo_bin_cmd!("resource-repo")
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::contains("__fish_resource_repo"));
}

#[test]
fn test_completions_global_config_flag() {
    cargo_bin_cmd!("resource-repo")
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_completions_invalid_shell() {
    cargo_bin_cmd!("resource-repo")
        .args(["completions", "tcsh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
