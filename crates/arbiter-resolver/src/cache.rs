//! Per-resolution memoization of provider callbacks.
//!
//! Version lists and dependency lists may be expensive to obtain, so every
//! callback is made at most once per key for the lifetime of a resolution,
//! backtracking included.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use arbiter_core::dependency::{DependencyList, Project};
use arbiter_core::selected::{Metadata, SelectedVersion};

use crate::error::ResolveError;
use crate::provider::DependencyProvider;

/// Counters for callback traffic during one resolution.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub version_fetches: usize,
    pub dependency_fetches: usize,
    pub metadata_lookups: usize,
    pub hits: usize,
}

/// Callback results keyed by project, (project, version) and
/// (project, metadata).
#[derive(Debug)]
pub struct FetchCache<P: Project> {
    versions: BTreeMap<P, Vec<SelectedVersion>>,
    dependencies: BTreeMap<(P, SelectedVersion), DependencyList<P>>,
    metadata: BTreeMap<(P, Metadata), Option<SelectedVersion>>,
    stats: CacheStats,
}

impl<P: Project> Default for FetchCache<P> {
    fn default() -> Self {
        Self {
            versions: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            metadata: BTreeMap::new(),
            stats: CacheStats::default(),
        }
    }
}

impl<P: Project> FetchCache<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Candidates for `project`, newest first.
    ///
    /// The provider's list is sorted descending and deduplicated the first
    /// time it is fetched.
    pub fn versions<D, C>(
        &mut self,
        provider: &D,
        cx: &C,
        project: &P,
    ) -> Result<Vec<SelectedVersion>, ResolveError>
    where
        D: DependencyProvider<P, C>,
    {
        match self.versions.entry(project.clone()) {
            Entry::Occupied(entry) => {
                self.stats.hits += 1;
                Ok(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                self.stats.version_fetches += 1;
                let mut versions = provider
                    .available_versions(cx, project)
                    .map_err(|e| ResolveError::callback(project, None, e))?;
                versions.sort_by(|a, b| b.cmp(a));
                versions.dedup();
                tracing::trace!("{project}: {} available versions", versions.len());
                Ok(entry.insert(versions).clone())
            }
        }
    }

    /// Append a version found through a metadata lookup to the end of the
    /// candidate list. Returns `false` if it was already a candidate.
    pub fn append_candidate(&mut self, project: &P, version: SelectedVersion) -> bool {
        let candidates = self.versions.entry(project.clone()).or_default();
        if candidates.contains(&version) {
            return false;
        }
        candidates.push(version);
        true
    }

    /// Dependencies declared by `version` of `project`.
    pub fn dependencies<D, C>(
        &mut self,
        provider: &D,
        cx: &C,
        project: &P,
        version: &SelectedVersion,
    ) -> Result<DependencyList<P>, ResolveError>
    where
        D: DependencyProvider<P, C>,
    {
        match self.dependencies.entry((project.clone(), version.clone())) {
            Entry::Occupied(entry) => {
                self.stats.hits += 1;
                Ok(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                self.stats.dependency_fetches += 1;
                let deps = provider
                    .dependencies(cx, project, version)
                    .map_err(|e| ResolveError::callback(project, Some(version.to_string()), e))?;
                Ok(entry.insert(deps).clone())
            }
        }
    }

    /// The version of `project` identified by `metadata`, if the provider
    /// knows one. Misses are cached too.
    pub fn version_for_metadata<D, C>(
        &mut self,
        provider: &D,
        cx: &C,
        project: &P,
        metadata: &Metadata,
    ) -> Option<SelectedVersion>
    where
        D: DependencyProvider<P, C>,
    {
        match self.metadata.entry((project.clone(), metadata.clone())) {
            Entry::Occupied(entry) => {
                self.stats.hits += 1;
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                self.stats.metadata_lookups += 1;
                entry
                    .insert(provider.version_for_metadata(cx, project, metadata))
                    .clone()
            }
        }
    }
}
