//! # Output Configuration
//!
//! This module controls how the CLI decorates resource listings: whether
//! collections are colored and which markers precede names.
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use console::style;
use std::env;

/// Output configuration for controlling colors and markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether colors should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `always` forces colors on (overriding `NO_COLOR`), `never` forces them
    /// off, anything else detects support from the environment and the
    /// terminal.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // Presence alone disables colors, even when empty
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Render a resource name for a listing. Collection names keep their
/// trailing slash and are highlighted when colors are enabled.
pub fn resource_name(config: &OutputConfig, name: &str, is_collection: bool) -> String {
    let display = if is_collection {
        format!("{}/", name.trim_end_matches('/'))
    } else {
        name.to_string()
    };
    if config.use_color && is_collection {
        style(display).blue().bold().force_styling(true).to_string()
    } else {
        display
    }
}

/// Render a property URI for `describe` output.
pub fn property_name(config: &OutputConfig, uri: &str) -> String {
    if config.use_color {
        style(uri).cyan().force_styling(true).to_string()
    } else {
        uri.to_string()
    }
}
