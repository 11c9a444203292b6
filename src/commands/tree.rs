//! # Tree Command Implementation
//!
//! This module implements the `tree` subcommand, which displays a collection
//! and everything beneath it in a hierarchical format.
//!
//! ## Functionality
//!
//! - **Tree Visualization**: collections, resources and mounted repositories
//!   in one hierarchy
//! - **Depth Control**: `--depth` limits how many levels are shown
//!
//! This command is a read-only operation.

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};
use std::borrow::Cow;
use std::path::Path;
use url::Url;

use resource_repo::output::{self, OutputConfig};
use resource_repo::repository::{Repository, INFINITE_DEPTH};
use resource_repo::{suggestions, uri};

use super::{open_repository, resolve};

/// Display a collection as a tree
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Collection to display, relative to the repository root or an absolute URI.
    #[arg(value_name = "COLLECTION", default_value = "")]
    pub collection: String,

    /// Maximum depth to display in the tree.
    ///
    /// If not specified, displays the full tree. Use 0 to show only the
    /// collection itself, 1 to show its direct children, etc.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

/// Execute the `tree` command.
pub fn execute(config_path: &Path, output: &OutputConfig, args: TreeArgs) -> Result<()> {
    let repository = open_repository(config_path)?;
    let collection = uri::as_collection(&resolve(&repository, &args.collection)?);
    repository
        .describe(&collection)
        .map_err(suggestions::explain)?;

    let tree_root = build_tree_node(
        &repository,
        &collection,
        collection.to_string(),
        output,
        args.depth.unwrap_or(INFINITE_DEPTH),
    )?;
    print_tree(&tree_root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

/// Build a tree node for `uri`, descending `remaining` more levels.
fn build_tree_node(
    repository: &Repository,
    uri: &Url,
    label: String,
    output: &OutputConfig,
    remaining: usize,
) -> Result<TreeNode> {
    if remaining == 0 || !uri::is_collection(uri) {
        return Ok(TreeNode {
            label,
            children: vec![],
        });
    }
    let next = if remaining == INFINITE_DEPTH {
        remaining
    } else {
        remaining - 1
    };
    let children = repository
        .children(uri, None, 1)
        .map_err(suggestions::explain)?
        .into_iter()
        .map(|child| {
            let name = child.name().unwrap_or_default();
            let label = output::resource_name(output, &name, child.is_collection());
            build_tree_node(repository, child.uri(), label, output, next)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(TreeNode { label, children })
}

/// Tree node structure for ptree visualization
#[derive(Clone, Debug)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::from(&self.children[..])
    }
}
