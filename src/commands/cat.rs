//! # Cat Command Implementation
//!
//! Streams the content of a resource to stdout.

use anyhow::{Context, Result};
use clap::Args;
use std::io;
use std::path::Path;

use resource_repo::suggestions;
use resource_repo::transfer::{copy_stream, NoProgress};

use super::{open_repository, resolve};

/// Write the content of a resource to stdout
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Resource to read, relative to the repository root or an absolute URI.
    #[arg(value_name = "RESOURCE")]
    pub resource: String,
}

/// Execute the `cat` command.
pub fn execute(config_path: &Path, args: CatArgs) -> Result<()> {
    let repository = open_repository(config_path)?;
    let uri = resolve(&repository, &args.resource)?;
    let mut reader = repository.read(&uri).map_err(suggestions::explain)?;

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    copy_stream(&mut reader, &mut writer, None, &NoProgress)
        .with_context(|| format!("Failed to read {}", uri))?;
    Ok(())
}
