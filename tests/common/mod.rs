//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures, helper functions, and
//! configuration snippets to reduce duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::FILESYSTEM);
//!     fixture.command().arg("ls").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;
use std::sync::Arc;
use url::Url;

use resource_repo::backend::MemoryBackend;
use resource_repo::repository::Repository;

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::configs;
    pub use super::{memory_repository, public_root, TestFixture};
}

/// Configuration file name written by [`TestFixture::with_config`].
pub const CONFIG_FILE: &str = "repository.yaml";

/// Common configuration YAML snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// A filesystem-backed repository serving `data/`.
    pub const FILESYSTEM: &str = r#"
root: "http://example.com/repo/"
backend:
  kind: filesystem
  path: data
"#;

    /// A filesystem-backed repository with a second one mounted at `archive/`.
    pub const WITH_MOUNT: &str = r#"
root: "http://example.com/repo/"
backend:
  kind: filesystem
  path: data
mounts:
  - path: "archive/"
    repository:
      backend:
        kind: filesystem
        path: archive-data
"#;

    /// A read-only filesystem-backed repository.
    pub const READ_ONLY: &str = r#"
root: "http://example.com/repo/"
backend:
  kind: filesystem
  path: data
read_only: true
"#;

    /// A configuration naming a backend kind nobody registered.
    pub const UNKNOWN_BACKEND: &str = r#"
backend:
  kind: filesytem
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "invalid: yaml: content:";
}

/// Public root used by library-level tests.
#[allow(dead_code)]
pub fn public_root() -> Url {
    Url::parse("http://example.com/repo/").unwrap()
}

/// A memory-backed repository rooted at [`public_root`].
#[allow(dead_code)]
pub fn memory_repository(name: &str) -> Arc<Repository> {
    Repository::with_root(Box::new(MemoryBackend::new(name)), public_root())
        .expect("Failed to create repository")
}

/// A test fixture that provides a temporary directory with optional config.
///
/// This struct simplifies the common pattern of creating a temp directory
/// and populating it with a `repository.yaml` configuration file and the
/// files a filesystem backend serves.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `repository.yaml` configuration file with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child(CONFIG_FILE)
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add an empty directory.
    pub fn with_dir(self, path: &str) -> Self {
        self.temp_dir
            .child(path)
            .create_dir_all()
            .expect("Failed to create directory");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join(CONFIG_FILE)
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    ///
    /// The configuration environment variable is cleared so the command
    /// always reads `repository.yaml` from the fixture unless told otherwise.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("resource-repo");
        cmd.current_dir(self.path())
            .env_remove("RESOURCE_REPO_CONFIG")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
