//! Offline registry files.
//!
//! A registry is a TOML document listing the root requirements, every
//! available version of every project with its own requirements, and optional
//! resolver settings:
//!
//! ```toml
//! [resolver]
//! max-iterations = 5000
//!
//! [dependencies]
//! a = ">=1.0.0"
//!
//! [projects.a."2.0.0"]
//! dependencies = { b = "==1.0.0" }
//!
//! [projects.a."1.5.0"]
//!
//! [projects.b."1.0.0"]
//! ref = "feature-x"
//! hidden = true
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use arbiter_util::errors::ArbiterError;

use crate::dependency::DependencyList;
use crate::error::ModelError;
use crate::requirement::Requirement;
use crate::selected::{Metadata, SelectedVersion};
use crate::version::SemanticVersion;

/// A parsed registry file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Root requirements, project name to requirement text.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Project name to version text to version entry.
    #[serde(default)]
    pub projects: BTreeMap<String, BTreeMap<String, VersionEntry>>,
}

/// Resolver settings from `[resolver]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverSettings {
    #[serde(default, rename = "max-iterations")]
    pub max_iterations: Option<usize>,
}

/// One available version of a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionEntry {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Opaque metadata, typically a VCS ref.
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,

    /// Hidden versions are not enumerated; they can only be reached through
    /// a metadata pin (`@ref`).
    #[serde(default)]
    pub hidden: bool,
}

/// A fully parsed version from a registry.
#[derive(Debug, Clone)]
pub struct RegistryVersion {
    pub project: String,
    pub version: SelectedVersion,
    pub dependencies: DependencyList<String>,
    pub hidden: bool,
}

impl Registry {
    /// Load and parse a registry file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = arbiter_util::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a registry from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            ArbiterError::Registry {
                message: format!("Failed to parse registry: {e}"),
            }
            .into()
        })
    }

    /// The root dependency list, in project-name order.
    pub fn root_dependencies(&self) -> Result<DependencyList<String>, ModelError> {
        parse_dependencies(&self.dependencies)
    }

    /// Every version of every project, parsed.
    pub fn versions(&self) -> Result<Vec<RegistryVersion>, ModelError> {
        let mut out = Vec::new();
        for (project, versions) in &self.projects {
            for (text, entry) in versions {
                let version = SemanticVersion::parse(text)?;
                let metadata = entry.reference.clone().map(Metadata::from);
                out.push(RegistryVersion {
                    project: project.clone(),
                    version: SelectedVersion::new(version, metadata),
                    dependencies: parse_dependencies(&entry.dependencies)?,
                    hidden: entry.hidden,
                });
            }
        }
        Ok(out)
    }
}

fn parse_dependencies(
    raw: &BTreeMap<String, String>,
) -> Result<DependencyList<String>, ModelError> {
    let mut entries = Vec::with_capacity(raw.len());
    for (project, text) in raw {
        entries.push((project.clone(), text.parse::<Requirement>()?));
    }
    DependencyList::try_from_entries(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[resolver]
max-iterations = 50

[dependencies]
a = ">=1.0.0"
c = "@feature-x"

[projects.a."2.0.0"]
dependencies = { b = "==1.0.0" }

[projects.a."1.5.0"]

[projects.b."2.0.0"]

[projects.c."0.1.0"]
ref = "feature-x"
hidden = true
"#;

    #[test]
    fn parses_sample() {
        let registry = Registry::from_str(SAMPLE).unwrap();
        assert_eq!(registry.resolver.max_iterations, Some(50));
        assert_eq!(registry.dependencies.len(), 2);
        assert_eq!(registry.projects["a"].len(), 2);
        assert!(registry.projects["c"]["0.1.0"].hidden);
    }

    #[test]
    fn root_dependencies_parse_requirements() {
        let registry = Registry::from_str(SAMPLE).unwrap();
        let root = registry.root_dependencies().unwrap();
        assert_eq!(root.len(), 2);
        assert_eq!(root.get(&"a".to_string()).unwrap().to_string(), ">=1.0.0");
        assert_eq!(root.get(&"c".to_string()).unwrap().to_string(), "@feature-x");
    }

    #[test]
    fn versions_carry_metadata_and_dependencies() {
        let registry = Registry::from_str(SAMPLE).unwrap();
        let versions = registry.versions().unwrap();
        assert_eq!(versions.len(), 4);
        let a2 = versions
            .iter()
            .find(|v| v.project == "a" && v.version.to_string() == "2.0.0")
            .unwrap();
        assert_eq!(a2.dependencies.len(), 1);
        let c = versions.iter().find(|v| v.project == "c").unwrap();
        assert_eq!(c.version.to_string(), "0.1.0 (feature-x)");
        assert!(c.hidden);
    }

    #[test]
    fn bad_version_key_is_reported() {
        let registry = Registry::from_str("[projects.a.\"one\"]\n").unwrap();
        let err = registry.versions().unwrap_err();
        assert!(matches!(err, ModelError::MalformedVersion { .. }));
    }

    #[test]
    fn bad_requirement_is_reported() {
        let registry = Registry::from_str("[dependencies]\na = \">=oops\"\n").unwrap();
        let err = registry.root_dependencies().unwrap_err();
        assert!(matches!(err, ModelError::MalformedRequirement { .. }));
    }

    #[test]
    fn invalid_toml_is_a_registry_error() {
        let err = Registry::from_str("[dependencies\n").unwrap_err();
        assert!(err.to_string().contains("Registry error"), "got: {err}");
    }
}
