//! # Ls Command Implementation
//!
//! This module implements the `ls` subcommand, which lists the children of a
//! collection.
//!
//! ## Functionality
//!
//! - **Depth Control**: direct children by default, `--recursive` for the
//!   whole subtree or `--depth N` for a fixed number of levels
//! - **Pattern Filtering**: glob patterns matched against resource names
//! - **Detailed Output**: optional long format showing size and modification
//!   time
//!
//! Mounted repositories appear as ordinary collections. This command is a
//! read-only operation.

use anyhow::Result;
use clap::Args;
use std::path::Path;

use resource_repo::error::Error;
use resource_repo::filter::{CollectionFilter, GlobFilter, ResourceFilter};
use resource_repo::output::{self, OutputConfig};
use resource_repo::property::Resource;
use resource_repo::repository::INFINITE_DEPTH;
use resource_repo::{suggestions, uri};

use super::{format_size, open_repository, resolve};

/// List the children of a collection
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Collection to list, relative to the repository root or an absolute URI.
    #[arg(value_name = "COLLECTION", default_value = "")]
    pub collection: String,

    /// Filter resources by a glob pattern on their names (e.g., "*.txt").
    #[arg(short, long, value_name = "PATTERN")]
    pub pattern: Option<String>,

    /// List only collections.
    #[arg(short = 'd', long)]
    pub collections_only: bool,

    /// Use long listing format showing size and modification time.
    #[arg(short, long)]
    pub long: bool,

    /// List the whole subtree.
    #[arg(short = 'R', long, conflicts_with = "depth")]
    pub recursive: bool,

    /// Number of levels to list.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,

    /// Show only the total count of resources.
    #[arg(long)]
    pub count: bool,
}

impl LsArgs {
    fn depth(&self) -> usize {
        if self.recursive {
            INFINITE_DEPTH
        } else {
            self.depth.unwrap_or(1)
        }
    }
}

struct Filters {
    pattern: Option<GlobFilter>,
    collections_only: bool,
}

impl ResourceFilter for Filters {
    fn is_pass(&self, resource: &Resource) -> bool {
        (!self.collections_only || CollectionFilter.is_pass(resource))
            && self
                .pattern
                .as_ref()
                .map_or(true, |pattern| pattern.is_pass(resource))
    }
}

/// Execute the `ls` command.
pub fn execute(config_path: &Path, output: &OutputConfig, args: LsArgs) -> Result<()> {
    let repository = open_repository(config_path)?;
    let collection = resolve(&repository, &args.collection)?;
    let collection = uri::as_collection(&collection);

    let pattern = args
        .pattern
        .as_deref()
        .map(|pattern| {
            GlobFilter::new(pattern).map_err(|e| match e {
                Error::Glob(e) => suggestions::invalid_glob(pattern, &e),
                other => anyhow::Error::new(other),
            })
        })
        .transpose()?;
    let filters = Filters {
        pattern,
        collections_only: args.collections_only,
    };

    // Fails with not-found before listing a missing collection
    repository.describe(&collection).map_err(suggestions::explain)?;
    let children = repository
        .children(&collection, Some(&filters), args.depth())
        .map_err(suggestions::explain)?;

    if args.count {
        println!("{}", children.len());
        return Ok(());
    }

    for child in &children {
        let name = uri::relativize(&collection, child.uri())
            .map(|relative| uri::decode_segment(&relative))
            .unwrap_or_else(|| child.uri().to_string());
        let name = output::resource_name(output, &name, child.is_collection());
        if args.long {
            println!("{}", long_line(child, &name));
        } else {
            println!("{}", name);
        }
    }
    Ok(())
}

fn long_line(resource: &Resource, name: &str) -> String {
    let size = if resource.is_collection() {
        "-".to_string()
    } else {
        resource
            .content_length()
            .map(format_size)
            .unwrap_or_else(|| "-".to_string())
    };
    let modified = resource
        .modified()
        .map(|modified| modified.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".repeat(16));
    format!("{:>8}  {}  {}", size, modified, name)
}
