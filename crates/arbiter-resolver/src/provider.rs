//! The boundary between the resolver and whoever knows about projects.
//!
//! A [`DependencyProvider`] answers three questions: which versions of a
//! project exist, what a given version depends on, and (optionally) which
//! version corresponds to a piece of metadata that was never enumerated.
//! [`OfflineDependencyProvider`] is an in-memory implementation, also used
//! to serve registry files.

use std::collections::BTreeMap;

use thiserror::Error;

use arbiter_core::dependency::{DependencyList, Project};
use arbiter_core::error::ModelError;
use arbiter_core::registry::Registry;
use arbiter_core::requirement::Requirement;
use arbiter_core::selected::{Metadata, SelectedVersion};

/// Caller-supplied behaviors for a resolution.
///
/// `C` is the caller context handed to [`crate::resolver::Resolver::new`];
/// every callback receives it by shared reference for the duration of the
/// call. Callbacks are invoked synchronously and must be deterministic for a
/// given input. Returned values are owned by the resolver from then on.
pub trait DependencyProvider<P: Project, C = ()> {
    /// Error returned by a failing callback. It is surfaced verbatim and ends
    /// the resolution.
    type Err: std::error::Error + Send + Sync + 'static;

    /// All versions of `project` that may be selected. Order does not matter;
    /// the resolver sorts newest first.
    fn available_versions(&self, cx: &C, project: &P) -> Result<Vec<SelectedVersion>, Self::Err>;

    /// The requirements declared by `version` of `project`.
    fn dependencies(
        &self,
        cx: &C,
        project: &P,
        version: &SelectedVersion,
    ) -> Result<DependencyList<P>, Self::Err>;

    /// The version of `project` identified by `metadata`, for versions that
    /// cannot practically be enumerated (commit hashes, for instance).
    fn version_for_metadata(
        &self,
        _cx: &C,
        _project: &P,
        _metadata: &Metadata,
    ) -> Option<SelectedVersion> {
        None
    }

    /// Polled once per iteration of the search loop.
    fn should_cancel(&self, _cx: &C) -> bool {
        false
    }
}

/// Errors from [`OfflineDependencyProvider`].
#[derive(Debug, Error)]
pub enum OfflineError {
    #[error("`{project}` has no version {version}")]
    UnknownVersion { project: String, version: String },
}

#[derive(Debug, Clone)]
struct OfflineVersion<P> {
    dependencies: DependencyList<P>,
    hidden: bool,
}

/// An in-memory provider.
///
/// Unknown projects simply have no versions, which the resolver reports as a
/// conflict rather than a callback failure.
#[derive(Debug, Clone)]
pub struct OfflineDependencyProvider<P: Project> {
    projects: BTreeMap<P, BTreeMap<SelectedVersion, OfflineVersion<P>>>,
}

impl<P: Project> Default for OfflineDependencyProvider<P> {
    fn default() -> Self {
        Self {
            projects: BTreeMap::new(),
        }
    }
}

impl<P: Project> OfflineDependencyProvider<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `version` of `project` with its dependencies. Registering the
    /// same version again replaces it.
    pub fn add_version<I>(&mut self, project: P, version: impl Into<SelectedVersion>, dependencies: I)
    where
        I: IntoIterator<Item = (P, Requirement)>,
    {
        self.insert(project, version.into(), dependencies.into_iter().collect(), false);
    }

    /// Register a version that is not enumerated by
    /// [`DependencyProvider::available_versions`] and can only be reached
    /// through [`DependencyProvider::version_for_metadata`].
    pub fn add_hidden_version<I>(&mut self, project: P, version: SelectedVersion, dependencies: I)
    where
        I: IntoIterator<Item = (P, Requirement)>,
    {
        self.insert(project, version, dependencies.into_iter().collect(), true);
    }

    fn insert(
        &mut self,
        project: P,
        version: SelectedVersion,
        dependencies: DependencyList<P>,
        hidden: bool,
    ) {
        self.projects.entry(project).or_default().insert(
            version,
            OfflineVersion {
                dependencies,
                hidden,
            },
        );
    }

    /// Known projects, in order.
    pub fn projects(&self) -> impl Iterator<Item = &P> {
        self.projects.keys()
    }

    /// Every registered version of `project`, hidden ones included, oldest
    /// first.
    pub fn versions(&self, project: &P) -> Option<impl Iterator<Item = &SelectedVersion>> {
        self.projects.get(project).map(|versions| versions.keys())
    }
}

impl OfflineDependencyProvider<String> {
    /// Build a provider serving every version listed in a registry file.
    pub fn from_registry(registry: &Registry) -> Result<Self, ModelError> {
        let mut provider = Self::new();
        for entry in registry.versions()? {
            provider.insert(entry.project, entry.version, entry.dependencies, entry.hidden);
        }
        Ok(provider)
    }
}

impl<P: Project, C> DependencyProvider<P, C> for OfflineDependencyProvider<P> {
    type Err = OfflineError;

    fn available_versions(&self, _cx: &C, project: &P) -> Result<Vec<SelectedVersion>, Self::Err> {
        Ok(self
            .projects
            .get(project)
            .map(|versions| {
                versions
                    .iter()
                    .rev()
                    .filter(|(_, v)| !v.hidden)
                    .map(|(version, _)| version.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn dependencies(
        &self,
        _cx: &C,
        project: &P,
        version: &SelectedVersion,
    ) -> Result<DependencyList<P>, Self::Err> {
        self.projects
            .get(project)
            .and_then(|versions| versions.get(version))
            .map(|v| v.dependencies.clone())
            .ok_or_else(|| OfflineError::UnknownVersion {
                project: project.to_string(),
                version: version.to_string(),
            })
    }

    fn version_for_metadata(
        &self,
        _cx: &C,
        project: &P,
        metadata: &Metadata,
    ) -> Option<SelectedVersion> {
        self.projects
            .get(project)?
            .keys()
            .rev()
            .find(|version| version.metadata() == Some(metadata))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::version::SemanticVersion;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    fn provider() -> OfflineDependencyProvider<&'static str> {
        let mut p = OfflineDependencyProvider::new();
        p.add_version("a", v("1.0.0"), []);
        p.add_version("a", v("2.0.0"), [("b", Requirement::at_least(v("1.0.0")))]);
        p.add_hidden_version("a", SelectedVersion::with_metadata(v("2.1.0"), "abc123"), []);
        p
    }

    #[test]
    fn available_versions_are_newest_first_without_hidden() {
        let p = provider();
        let versions =
            DependencyProvider::<&str>::available_versions(&p, &(), &"a").unwrap();
        let text: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(text, vec!["2.0.0", "1.0.0"]);
    }

    #[test]
    fn unknown_project_has_no_versions() {
        let p = provider();
        let versions =
            DependencyProvider::<&str>::available_versions(&p, &(), &"zzz").unwrap();
        assert!(versions.is_empty());
    }

    #[test]
    fn dependencies_of_known_version() {
        let p = provider();
        let deps = DependencyProvider::<&str>::dependencies(&p, &(), &"a", &v("2.0.0").into())
            .unwrap();
        assert_eq!(deps.len(), 1);
        assert!(deps.get(&"b").is_some());
    }

    #[test]
    fn dependencies_of_unknown_version_fail() {
        let p = provider();
        let err = DependencyProvider::<&str>::dependencies(&p, &(), &"a", &v("9.0.0").into())
            .unwrap_err();
        assert_eq!(err.to_string(), "`a` has no version 9.0.0");
    }

    #[test]
    fn metadata_lookup_finds_hidden_versions() {
        let p = provider();
        let found = DependencyProvider::<&str>::version_for_metadata(
            &p,
            &(),
            &"a",
            &Metadata::from("abc123"),
        )
        .unwrap();
        assert_eq!(found.to_string(), "2.1.0 (abc123)");
        assert!(DependencyProvider::<&str>::version_for_metadata(
            &p,
            &(),
            &"a",
            &Metadata::from("nope")
        )
        .is_none());
    }

    #[test]
    fn from_registry() {
        let registry = Registry::from_str(
            r#"
[projects.a."1.0.0"]
dependencies = { b = "^0.1.0" }

[projects.b."0.1.3"]
"#,
        )
        .unwrap();
        let p = OfflineDependencyProvider::from_registry(&registry).unwrap();
        assert_eq!(p.projects().count(), 2);
        assert_eq!(p.versions(&"b".to_string()).unwrap().count(), 1);
    }
}
