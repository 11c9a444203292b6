//! End-to-end tests for the `cp` and `mv` commands, within one repository
//! and across a mounted sub-repository.

#[allow(dead_code)]
mod common;
use common::prelude::*;

fn mounted() -> TestFixture {
    TestFixture::new()
        .with_config(configs::WITH_MOUNT)
        .with_file("data/a.txt", "alpha")
        .with_file("data/docs/b.txt", "bravo")
        .with_file("data/docs/sub/c.txt", "charlie")
        .with_dir("archive-data")
}

#[test]
fn test_cp_collection_into_mount() {
    let fixture = mounted();
    fixture
        .command()
        .args(["cp", "docs/", "archive/docs/"])
        .assert()
        .success();

    fixture.child("archive-data/docs/b.txt").assert("bravo");
    fixture.child("archive-data/docs/sub/c.txt").assert("charlie");
    fixture.child("data/docs/b.txt").assert("bravo");
}

#[test]
fn test_cp_collection_destination_without_slash() {
    let fixture = mounted();
    fixture
        .command()
        .args(["cp", "docs/", "copy"])
        .assert()
        .success();
    fixture.child("data/copy/b.txt").assert("bravo");
}

#[test]
fn test_cp_existing_destination_needs_overwrite() {
    let fixture = mounted();
    fixture
        .command()
        .args(["cp", "a.txt", "docs/b.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--overwrite"));
    fixture.child("data/docs/b.txt").assert("bravo");

    fixture
        .command()
        .args(["cp", "--overwrite", "a.txt", "docs/b.txt"])
        .assert()
        .success();
    fixture.child("data/docs/b.txt").assert("alpha");
}

#[test]
fn test_cp_into_own_subtree_rejected() {
    let fixture = mounted();
    fixture
        .command()
        .args(["cp", "docs/", "docs/sub/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular operation"));
    fixture
        .child("data/docs/sub/sub")
        .assert(predicate::path::missing());
}

#[test]
fn test_mv_within_repository() {
    let fixture = mounted();
    fixture
        .command()
        .args(["mv", "a.txt", "docs/a.txt"])
        .assert()
        .success();
    fixture.child("data/a.txt").assert(predicate::path::missing());
    fixture.child("data/docs/a.txt").assert("alpha");
}

#[test]
fn test_mv_across_mount_with_progress() {
    let fixture = mounted();
    fixture
        .command()
        .args(["mv", "--progress", "docs/", "archive/moved/"])
        .assert()
        .success();
    fixture.child("data/docs").assert(predicate::path::missing());
    fixture.child("archive-data/moved/sub/c.txt").assert("charlie");
}

#[test]
fn test_mv_root_rejected() {
    // Every destination lies beneath the root
    mounted()
        .command()
        .args(["mv", "/", "elsewhere/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot transfer"));
}
