//! Command dispatch and handler modules.

mod resolve;
mod tree;
mod why;

use std::path::{Path, PathBuf};

use miette::Result;

use arbiter_core::registry::Registry;
use arbiter_resolver::{
    ConflictReport, OfflineDependencyProvider, ResolvedDependencyGraph, Resolver, ResolverConfig,
};
use arbiter_util::errors::ArbiterError;
use arbiter_util::progress;

use crate::cli::{Cli, Command};

/// File looked up from the current directory upwards when `--registry` is
/// not given.
const DEFAULT_REGISTRY: &str = "arbiter.toml";

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let session = Session {
        registry: cli.registry,
        max_iterations: cli.max_iterations,
        verbose: cli.verbose,
    };
    match cli.command {
        Command::Resolve { conflicts } => resolve::exec(&session, conflicts),
        Command::Tree { depth, invert } => tree::exec(&session, depth, invert.as_deref()),
        Command::Why { project } => why::exec(&session, &project),
    }
}

/// Options shared by every command.
pub struct Session {
    registry: Option<PathBuf>,
    max_iterations: Option<usize>,
    verbose: bool,
}

/// A finished resolution.
pub struct Resolution {
    pub graph: ResolvedDependencyGraph<String>,
    pub conflicts: ConflictReport,
    pub iterations: usize,
}

impl Session {
    fn registry_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.registry {
            return Ok(path.clone());
        }
        let cwd = std::env::current_dir().map_err(ArbiterError::Io)?;
        match arbiter_util::fs::find_ancestor_with(&cwd, DEFAULT_REGISTRY) {
            Some(dir) => Ok(dir.join(DEFAULT_REGISTRY)),
            None => Err(ArbiterError::Generic {
                message: format!(
                    "No {DEFAULT_REGISTRY} found in {} or any parent directory; pass --registry",
                    cwd.display()
                ),
            }
            .into()),
        }
    }

    /// Load the registry and run the resolver over it.
    pub fn resolve(&self) -> Result<Resolution> {
        let path = self.registry_path()?;
        let registry = Registry::from_path(&path)?;

        let root = registry
            .root_dependencies()
            .map_err(|e| model_error(&path, e))?;
        let provider =
            OfflineDependencyProvider::from_registry(&registry).map_err(|e| model_error(&path, e))?;
        let mut config = ResolverConfig::from_settings(&registry.resolver);
        if let Some(max) = self.max_iterations {
            config.max_iterations = max;
        }

        if self.verbose {
            progress::status("Resolving", &path.display().to_string());
        }
        let pb = progress::spinner("Resolving dependencies...");
        let mut resolver = Resolver::new(provider, root, ()).with_config(config);
        let result = resolver.resolve();
        pb.finish_and_clear();

        let graph = result?;
        let conflicts = resolver.conflicts().clone();
        if !conflicts.is_empty() {
            progress::status_warn(
                "Backtracked",
                &format!("over {} conflict(s)", conflicts.len()),
            );
        }
        Ok(Resolution {
            graph,
            conflicts,
            iterations: resolver.iterations(),
        })
    }
}

fn model_error(path: &Path, e: arbiter_core::error::ModelError) -> miette::Report {
    ArbiterError::Registry {
        message: format!("{}: {e}", path.display()),
    }
    .into()
}
