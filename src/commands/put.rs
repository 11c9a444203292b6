//! # Put Command Implementation
//!
//! Creates a resource from a local file or stdin. An existing resource has
//! its content replaced and keeps its description.

use anyhow::{Context, Result};
use clap::Args;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use resource_repo::error::Error;
use resource_repo::property::Resource;
use resource_repo::suggestions;
use resource_repo::transfer::{copy_stream, NoProgress};

use super::{open_repository, resolve};

/// Create or replace a resource from a file or stdin
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Resource to write, relative to the repository root or an absolute URI.
    #[arg(value_name = "RESOURCE")]
    pub resource: String,

    /// Local file to upload. Reads stdin when omitted.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Fail instead of replacing an existing resource.
    #[arg(short = 'n', long)]
    pub no_clobber: bool,
}

/// Execute the `put` command.
pub fn execute(config_path: &Path, args: PutArgs) -> Result<()> {
    let repository = open_repository(config_path)?;
    let uri = resolve(&repository, &args.resource)?;

    let mut reader: Box<dyn Read> = match &args.file {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };
    let total = match &args.file {
        Some(path) => std::fs::metadata(path).ok().map(|metadata| metadata.len()),
        None => None,
    };

    let exists = repository.exists(&uri).map_err(suggestions::explain)?;
    if exists && args.no_clobber {
        return Err(suggestions::explain(Error::StateConflict {
            uri: uri.to_string(),
            message: "resource already exists".to_string(),
        }));
    }
    let mut writer = if exists {
        repository.write(&uri, None)
    } else {
        repository.create_stream(&uri, &Resource::new(uri.clone()))
    }
    .map_err(suggestions::explain)?;

    let written = copy_stream(&mut reader, &mut writer, total, &NoProgress)
        .with_context(|| format!("Failed to write {}", uri))?;
    drop(writer);
    log::info!("Wrote {} bytes to {}", written, uri);
    Ok(())
}
