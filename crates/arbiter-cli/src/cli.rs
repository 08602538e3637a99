//! CLI argument definitions for Arbiter.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "arbiter",
    version,
    about = "Resolve dependency versions from an offline registry",
    long_about = "Arbiter picks one version per project so that every requirement in a \
                  registry file holds, backtracking over older versions when needed."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Registry file (defaults to the nearest arbiter.toml)
    #[arg(short, long, global = true, env = "ARBITER_REGISTRY")]
    pub registry: Option<PathBuf>,

    /// Override the iteration bound from the registry
    #[arg(long, global = true)]
    pub max_iterations: Option<usize>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the registry and print the chosen versions
    Resolve {
        /// Also print conflicts recovered by backtracking
        #[arg(long)]
        conflicts: bool,
    },

    /// Display the resolved dependency tree
    Tree {
        /// Maximum display depth
        #[arg(short, long)]
        depth: Option<usize>,
        /// Show what depends on the given project instead
        #[arg(short, long, value_name = "PROJECT")]
        invert: Option<String>,
    },

    /// Show why a project is part of the resolution
    Why {
        /// Project name
        project: String,
    },
}

/// Parse command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_registry_flag() {
        let cli = Cli::parse_from(["arbiter", "tree", "-r", "reg.toml", "--depth", "2"]);
        assert_eq!(cli.registry, Some(PathBuf::from("reg.toml")));
        assert!(matches!(cli.command, Command::Tree { depth: Some(2), invert: None }));
    }
}
