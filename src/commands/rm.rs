//! # Rm Command Implementation
//!
//! Deletes a resource, or a collection with everything beneath it.

use anyhow::Result;
use clap::Args;
use std::path::Path;

use resource_repo::error::ErrorKind;
use resource_repo::suggestions;

use super::{open_repository, resolve};

/// Delete a resource or collection
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Resources to delete, relative to the repository root or absolute URIs.
    #[arg(value_name = "RESOURCE", required = true)]
    pub resources: Vec<String>,

    /// Ignore resources that do not exist.
    #[arg(short, long)]
    pub force: bool,
}

/// Execute the `rm` command.
pub fn execute(config_path: &Path, args: RmArgs) -> Result<()> {
    let repository = open_repository(config_path)?;
    for reference in &args.resources {
        let uri = resolve(&repository, reference)?;
        match repository.delete(&uri) {
            Ok(()) => log::info!("Deleted {}", uri),
            Err(e) if args.force && e.kind() == ErrorKind::NotFound => {
                log::debug!("Skipping missing {}", uri)
            }
            Err(e) => return Err(suggestions::explain(e)),
        }
    }
    Ok(())
}
