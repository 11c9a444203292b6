//! Default values for resource-repo configuration.
//!
//! This module keeps the defaults shared by the library and the CLI in one
//! place.

use std::path::PathBuf;

/// File name looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILENAME: &str = "repository.yaml";

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "RESOURCE_REPO_CONFIG";

/// Returns the default directory served by a filesystem backend whose
/// configuration omits `path`.
///
/// Uses the platform-appropriate data directory:
/// - Linux: `~/.local/share/resource-repo` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/resource-repo`
/// - Windows: `{FOLDERID_RoamingAppData}\resource-repo`
///
/// Falls back to `.resource-repo` in the current directory if the platform
/// data directory cannot be determined.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("resource-repo"))
        .unwrap_or_else(|| PathBuf::from(".resource-repo"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_dir_returns_path() {
        let data_dir = default_data_dir();
        assert!(
            data_dir.ends_with("resource-repo") || data_dir.ends_with(".resource-repo"),
            "unexpected data dir: {:?}",
            data_dir
        );
    }

    #[test]
    fn test_default_config_filename_is_yaml() {
        assert!(DEFAULT_CONFIG_FILENAME.ends_with(".yaml"));
    }
}
