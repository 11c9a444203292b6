//! # Error Suggestions
//!
//! This module provides helper functions for generating helpful error
//! messages with hints and suggestions. Errors should tell users what went
//! wrong AND how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crate::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("Configuration file not found: {}", path.display());
//!
//! // Use:
//! return Err(suggestions::config_not_found(path));
//! ```

use std::path::Path;

use crate::error::{Error, ErrorKind};

/// Generate an error for when the configuration file is not found.
///
/// Includes hints about:
/// - Creating a new config file
/// - Using the -c/--config flag
/// - Using the RESOURCE_REPO_CONFIG environment variable
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Configuration file not found: {path}\n\n\
         hint: Create a repository.yaml file describing the backend\n\
         hint: Use -c/--config to specify a different path\n\
         hint: Set RESOURCE_REPO_CONFIG environment variable",
        path = path.display()
    )
}

/// Generate an error for an invalid glob pattern.
///
/// Includes hints about glob syntax.
pub fn invalid_glob(pattern: &str, error: &glob::PatternError) -> anyhow::Error {
    anyhow::anyhow!(
        "Invalid glob pattern: {pattern}\n\
         error: {error}\n\n\
         hint: Patterns match resource names, e.g. '*.txt'\n\
         hint: Use [abc] for character classes, [!abc] to negate\n\
         hint: Escape special characters with backslash"
    )
}

/// Generate an error for an unknown backend kind.
///
/// Includes the list of registered kinds and a close match if there is one.
pub fn unknown_backend(kind: &str, known: &[&str]) -> anyhow::Error {
    let suggestion = find_similar(kind, known);
    let did_you_mean = suggestion
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Unknown backend kind: {kind}{did_you_mean}\n\n\
         Valid backend kinds are: {kinds}",
        kinds = known.join(", ")
    )
}

/// Attach a hint to a repository error when the failure has an obvious
/// remedy. Other errors pass through unchanged.
pub fn explain(error: Error) -> anyhow::Error {
    let hint = match error.kind() {
        ErrorKind::NotFound => Some("hint: Use 'resource-repo ls' to list existing resources"),
        ErrorKind::StateConflict => Some("hint: Pass --overwrite to replace the destination"),
        ErrorKind::Forbidden => {
            Some("hint: Check 'read_only' in the configuration of the owning repository")
        }
        ErrorKind::Precondition => {
            Some("hint: Set 'auto_open: true' or make sure the parent collection exists")
        }
        ErrorKind::InvalidArgument | ErrorKind::Io => None,
    };
    match hint {
        Some(hint) => anyhow::anyhow!("{error}\n\n{hint}"),
        None => anyhow::Error::new(error),
    }
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut previous: Vec<usize> = (0..=b_len).collect();
    let mut current = vec![0usize; b_len + 1];

    for i in 1..=a_len {
        current[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            current[j] = (previous[j] + 1)
                .min(current[j - 1] + 1)
                .min(previous[j - 1] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_len]
}
