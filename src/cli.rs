//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use resource_repo::defaults::{CONFIG_ENV, DEFAULT_CONFIG_FILENAME};
use resource_repo::output::OutputConfig;

use crate::commands;

/// Resource Repository - Browse and edit resources across mounted storage backends
#[derive(Parser, Debug)]
#[command(name = "resource-repo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Path to the repository configuration file
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = CONFIG_ENV,
        default_value = DEFAULT_CONFIG_FILENAME
    )]
    config: PathBuf,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the children of a collection
    Ls(commands::ls::LsArgs),
    /// Display a collection and its descendants as a tree
    Tree(commands::tree::TreeArgs),
    /// Write the content of a resource to stdout
    Cat(commands::cat::CatArgs),
    /// Create or replace a resource from a file or stdin
    Put(commands::put::PutArgs),
    /// Create a collection
    Mkdir(commands::mkdir::MkdirArgs),
    /// Delete a resource or a collection with everything beneath it
    Rm(commands::rm::RmArgs),
    /// Show the properties of a resource
    Describe(commands::describe::DescribeArgs),
    /// Add, set or remove properties of a resource
    Alter(commands::alter::AlterArgs),
    /// Copy a resource or collection
    Cp(commands::transfer::TransferArgs),
    /// Move a resource or collection
    Mv(commands::transfer::TransferArgs),
    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let output = OutputConfig::from_env_and_flag(&self.color);
        let config = self.config;

        match self.command {
            Commands::Ls(args) => commands::ls::execute(&config, &output, args),
            Commands::Tree(args) => commands::tree::execute(&config, &output, args),
            Commands::Cat(args) => commands::cat::execute(&config, args),
            Commands::Put(args) => commands::put::execute(&config, args),
            Commands::Mkdir(args) => commands::mkdir::execute(&config, args),
            Commands::Rm(args) => commands::rm::execute(&config, args),
            Commands::Describe(args) => commands::describe::execute(&config, &output, args),
            Commands::Alter(args) => commands::alter::execute(&config, args),
            Commands::Cp(args) => {
                commands::transfer::execute(&config, commands::transfer::Mode::Copy, args)
            }
            Commands::Mv(args) => {
                commands::transfer::execute(&config, commands::transfer::Mode::Move, args)
            }
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second initialization only happens in tests; ignoring it is harmless
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
