//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `resource-repo` command-line tool. Each subcommand is defined in its own
//! file to keep the logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args`, opens the configured
//!   repository tree with [`open_repository`] and performs the command.
//!
//! Resource arguments are either absolute URIs or paths relative to the root
//! of the top-level repository (`docs/a.txt`, `/docs/`). Collections end
//! with `/`.

pub mod alter;
pub mod cat;
pub mod completions;
pub mod describe;
pub mod ls;
pub mod mkdir;
pub mod put;
pub mod rm;
pub mod transfer;
pub mod tree;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use url::Url;

use resource_repo::config::{self, BackendRegistry, RepositoryConfig};
use resource_repo::repository::Repository;
use resource_repo::suggestions;

/// Load the configuration at `config_path`, build the repository tree and
/// open it.
pub fn open_repository(config_path: &Path) -> Result<Arc<Repository>> {
    if !config_path.exists() {
        return Err(suggestions::config_not_found(config_path));
    }
    let repository_config = config::load(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let registry = BackendRegistry::with_defaults();
    check_backend_kinds(&repository_config, &registry)?;

    let repository = config::build(&repository_config, &registry)
        .with_context(|| format!("Failed to build repository from {}", config_path.display()))?;
    repository.open().map_err(suggestions::explain)?;
    log::debug!(
        "opened repository rooted at {}",
        repository
            .root_uri()
            .map(|root| root.to_string())
            .unwrap_or_default()
    );
    Ok(repository)
}

fn check_backend_kinds(config: &RepositoryConfig, registry: &BackendRegistry) -> Result<()> {
    let kinds = registry.kinds();
    if !kinds.contains(&config.backend.kind.as_str()) {
        return Err(suggestions::unknown_backend(&config.backend.kind, &kinds));
    }
    for mount in &config.mounts {
        check_backend_kinds(&mount.repository, registry)?;
    }
    Ok(())
}

/// Resolve a resource argument against the repository namespace.
pub fn resolve(repository: &Repository, reference: &str) -> Result<Url> {
    repository
        .resolve_uri(reference)
        .with_context(|| format!("Invalid resource reference: {}", reference))
}

/// Format a byte count the way `ls -lh` does.
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.1}G", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.1}M", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.1}K", size as f64 / KB as f64)
    } else {
        format!("{}B", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(1023), "1023B");
        assert_eq!(format_size(1024), "1.0K");
        assert_eq!(format_size(1536), "1.5K");
        assert_eq!(format_size(1024 * 1024), "1.0M");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0G");
    }

    #[test]
    fn test_unknown_kind_in_mount_reported() {
        let mut config = RepositoryConfig::for_backend("memory");
        config.mounts.push(config::MountConfig {
            path: "x/".to_string(),
            repository: RepositoryConfig::for_backend("memroy"),
        });
        let message = check_backend_kinds(&config, &BackendRegistry::with_defaults())
            .unwrap_err()
            .to_string();
        assert!(message.contains("Did you mean 'memory'?"));
    }
}
