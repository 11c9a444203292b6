//! # Completions Command
//!
//! Prints a `clap_complete` script so the shell can complete resource
//! commands (`ls`, `cat`, `put`, `cp`, `mv`, ...) and the global
//! `--config`, `--color` and `--log-level` flags.
//!
//! Resource URIs are not completed: they live in the configured repository,
//! which the shell script cannot open.
//!
//! ```bash
//! resource-repo completions bash > ~/.local/share/bash-completion/completions/resource-repo
//! resource-repo completions fish > ~/.config/fish/completions/resource-repo.fish
//! ```

use anyhow::Result;
use clap::{Args, CommandFactory, ValueEnum};
use clap_complete::{generate, Shell};
use std::io::{self, Write};

use crate::cli::Cli;

/// Shells with a completion generator.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Shell::Bash,
            CompletionShell::Zsh => Shell::Zsh,
            CompletionShell::Fish => Shell::Fish,
            CompletionShell::PowerShell => Shell::PowerShell,
            CompletionShell::Elvish => Shell::Elvish,
        }
    }
}

/// Print a shell completion script
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}

pub fn execute(args: CompletionsArgs) -> Result<()> {
    render(args.shell, &mut io::stdout().lock())
}

/// Write the completion script for `shell`, named after the binary.
fn render(shell: CompletionShell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(Shell::from(shell), &mut cmd, name, out);
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_shell_renders() {
        for shell in CompletionShell::value_variants() {
            let mut buffer = Vec::new();
            render(*shell, &mut buffer).unwrap();
            assert!(!buffer.is_empty(), "{:?} produced no script", shell);
        }
    }

    #[test]
    fn test_script_covers_resource_commands() {
        let mut buffer = Vec::new();
        render(CompletionShell::Zsh, &mut buffer).unwrap();
        let script = String::from_utf8(buffer).unwrap();
        for command in ["describe", "alter", "mkdir"] {
            assert!(script.contains(command), "missing {}", command);
        }
        assert!(script.contains("--log-level"));
    }
}
