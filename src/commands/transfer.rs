//! # Cp and Mv Command Implementation
//!
//! Copies or moves a resource, or a collection with everything beneath it.
//! Source and destination may live in different mounted repositories; the
//! repository tree picks the cheapest transfer the backends support.
//!
//! With `--progress`, byte counts of streamed content are shown with an
//! `indicatif` progress bar on stderr.

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use resource_repo::transfer::{NoProgress, ProgressListener};
use resource_repo::{suggestions, uri};

use super::{open_repository, resolve};

/// Whether the source survives the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Copy,
    Move,
}

/// Copy or move a resource
#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Source resource, relative to the repository root or an absolute URI.
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Destination resource. Collections must be given as collections
    /// (ending in '/').
    #[arg(value_name = "DESTINATION")]
    pub destination: String,

    /// Replace an existing destination.
    #[arg(short, long)]
    pub overwrite: bool,

    /// Show a progress bar while content is transferred.
    #[arg(long)]
    pub progress: bool,
}

/// Progress listener driving an `indicatif` bar.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} {bytes}/{total_bytes} {wide_bar}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }
}

impl ProgressListener for BarProgress {
    fn progress(&self, transferred: u64, total: Option<u64>) {
        if let Some(total) = total {
            self.bar.set_length(total);
        }
        self.bar.set_position(transferred);
    }
}

/// Execute the `cp` or `mv` command.
pub fn execute(config_path: &Path, mode: Mode, args: TransferArgs) -> Result<()> {
    let repository = open_repository(config_path)?;
    let source = resolve(&repository, &args.source)?;
    let mut destination = resolve(&repository, &args.destination)?;
    // `cp docs/ backup` means the collection `backup/`
    if uri::is_collection(&source) && !uri::is_collection(&destination) {
        destination = uri::as_collection(&destination);
    }

    let bar = args.progress.then(BarProgress::new);
    let listener: &dyn ProgressListener = match &bar {
        Some(bar) => bar,
        None => &NoProgress,
    };

    let result = match mode {
        Mode::Copy => repository.copy_resource(&source, &destination, args.overwrite, listener),
        Mode::Move => repository.move_resource(&source, &destination, args.overwrite, listener),
    };
    if let Some(bar) = &bar {
        bar.bar.finish_and_clear();
    }
    result.map_err(suggestions::explain)?;
    log::info!("{:?} {} -> {}", mode, source, destination);
    Ok(())
}
