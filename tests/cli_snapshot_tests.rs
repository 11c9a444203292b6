//! Snapshot tests for CLI output using insta.
//!
//! These tests capture listings and error messages as inline snapshots,
//! making it easy to review changes to user-facing output.
//!
//! To update snapshots after intentional changes:
//! ```bash
//! cargo insta test --accept
//! ```

#[allow(dead_code)]
mod common;
use common::prelude::*;

/// Strip trailing whitespace from each line for stable snapshots
fn normalize_output(output: &[u8]) -> String {
    String::from_utf8_lossy(output)
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

fn populated() -> TestFixture {
    TestFixture::new()
        .with_config(configs::WITH_MOUNT)
        .with_file("data/a.txt", "alpha")
        .with_file("data/docs/b.txt", "bravo")
        .with_file("archive-data/2020/report.txt", "old")
}

#[test]
fn test_recursive_listing_snapshot() {
    let output = populated()
        .command()
        .args(["--color", "never", "ls", "-R"])
        .output()
        .expect("Failed to execute command");

    insta::assert_snapshot!(normalize_output(&output.stdout), @r"
    a.txt
    archive/
    archive/2020/
    archive/2020/report.txt
    docs/
    docs/b.txt
    ");
}

#[test]
fn test_collections_only_snapshot() {
    let output = populated()
        .command()
        .args(["--color", "never", "ls", "-R", "-d"])
        .output()
        .expect("Failed to execute command");

    insta::assert_snapshot!(normalize_output(&output.stdout), @r"
    archive/
    archive/2020/
    docs/
    ");
}

#[test]
fn test_not_found_error_snapshot() {
    let output = populated()
        .command()
        .args(["cat", "missing.txt"])
        .output()
        .expect("Failed to execute command");

    insta::assert_snapshot!(normalize_output(&output.stderr), @r"
    Error: Resource not found: http://example.com/repo/missing.txt

    hint: Use 'resource-repo ls' to list existing resources
    ");
}
