//! # Mkdir Command Implementation
//!
//! Creates collections, optionally with their missing ancestors.

use anyhow::Result;
use clap::Args;
use std::path::Path;
use url::Url;

use resource_repo::repository::Repository;
use resource_repo::{suggestions, uri};

use super::{open_repository, resolve};

/// Create a collection
#[derive(Args, Debug)]
pub struct MkdirArgs {
    /// Collection to create, relative to the repository root or an absolute URI.
    #[arg(value_name = "COLLECTION")]
    pub collection: String,

    /// Create missing parent collections and accept an existing collection.
    #[arg(short, long)]
    pub parents: bool,
}

/// Execute the `mkdir` command.
pub fn execute(config_path: &Path, args: MkdirArgs) -> Result<()> {
    let repository = open_repository(config_path)?;
    let collection = uri::as_collection(&resolve(&repository, &args.collection)?);
    if args.parents {
        create_with_parents(&repository, &collection)?;
    } else {
        repository
            .create_collection(&collection)
            .map_err(suggestions::explain)?;
    }
    Ok(())
}

/// Create `collection` and every missing ancestor, outermost first.
fn create_with_parents(repository: &Repository, collection: &Url) -> Result<()> {
    let mut missing = Vec::new();
    let mut current = Some(collection.clone());
    while let Some(level) = current {
        if repository.exists(&level).map_err(suggestions::explain)? {
            break;
        }
        current = repository.parent_uri(&level).map_err(suggestions::explain)?;
        missing.push(level);
    }
    for level in missing.into_iter().rev() {
        repository
            .create_collection(&level)
            .map_err(suggestions::explain)?;
    }
    Ok(())
}
