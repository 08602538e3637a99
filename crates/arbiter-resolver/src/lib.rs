//! Dependency resolution engine: backtracking version search over
//! caller-supplied version and dependency data, conflict reporting and the
//! resolved dependency graph.
//!
//! ```no_run
//! use arbiter_core::dependency::DependencyList;
//! use arbiter_core::requirement::Requirement;
//! use arbiter_core::version::SemanticVersion;
//! use arbiter_resolver::{OfflineDependencyProvider, Resolver};
//!
//! let v = |s: &str| SemanticVersion::parse(s).unwrap();
//! let mut provider = OfflineDependencyProvider::new();
//! provider.add_version("a", v("1.0.0"), []);
//! let root = DependencyList::new().with("a", Requirement::at_least(v("1.0.0")));
//! let graph = Resolver::new(provider, root, ()).resolve().unwrap();
//! assert_eq!(graph.version_for(&"a").map(|s| s.to_string()), Some("1.0.0".into()));
//! ```

pub mod cache;
pub mod conflict;
pub mod error;
pub mod graph;
pub mod provider;
pub mod resolver;

pub use conflict::{Conflict, ConflictKind, ConflictReport};
pub use error::ResolveError;
pub use graph::{Dependent, ResolvedDependencyGraph, ResolvedNode};
pub use provider::{DependencyProvider, OfflineDependencyProvider};
pub use resolver::{Resolver, ResolverConfig};
