//! Dependency lists: what the root or one version of a project needs.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use crate::error::ModelError;
use crate::requirement::Requirement;

/// An opaque project identifier.
///
/// Blanket-implemented, so `String`, `&'static str` or any caller newtype with
/// the usual derives works out of the box.
pub trait Project: Clone + Eq + Hash + Ord + Debug + Display {}

impl<T: Clone + Eq + Hash + Ord + Debug + Display> Project for T {}

/// One entry of a [`DependencyList`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency<P> {
    pub project: P,
    pub requirement: Requirement,
}

/// An ordered mapping from project to requirement.
///
/// Each project appears at most once. Inserting a project that is already
/// present merges both requirements into a compound, since several
/// collaborators declaring the same project is the ordinary multi-dependent
/// case. [`DependencyList::try_from_entries`] is the strict alternative.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyList<P> {
    entries: Vec<Dependency<P>>,
}

impl<P> Default for DependencyList<P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<P: Project> DependencyList<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requirement on `project`, merging with any existing entry.
    pub fn insert(&mut self, project: P, requirement: Requirement) {
        match self.entries.iter_mut().find(|d| d.project == project) {
            Some(existing) => {
                tracing::trace!("merging duplicate requirement on {project}");
                let previous = std::mem::take(&mut existing.requirement);
                existing.requirement = previous.and(requirement);
            }
            None => self.entries.push(Dependency {
                project,
                requirement,
            }),
        }
    }

    /// Builder-style [`DependencyList::insert`].
    pub fn with(mut self, project: P, requirement: Requirement) -> Self {
        self.insert(project, requirement);
        self
    }

    /// Build a list, rejecting any project that appears twice.
    pub fn try_from_entries<I>(entries: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (P, Requirement)>,
    {
        let mut list = Self::new();
        for (project, requirement) in entries {
            if list.get(&project).is_some() {
                return Err(ModelError::DuplicateProject {
                    project: project.to_string(),
                });
            }
            list.entries.push(Dependency {
                project,
                requirement,
            });
        }
        Ok(list)
    }

    pub fn get(&self, project: &P) -> Option<&Requirement> {
        self.entries
            .iter()
            .find(|d| &d.project == project)
            .map(|d| &d.requirement)
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[Dependency<P>] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dependency<P>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Project> FromIterator<(P, Requirement)> for DependencyList<P> {
    fn from_iter<I: IntoIterator<Item = (P, Requirement)>>(iter: I) -> Self {
        let mut list = Self::new();
        for (project, requirement) in iter {
            list.insert(project, requirement);
        }
        list
    }
}

impl<P> IntoIterator for DependencyList<P> {
    type Item = Dependency<P>;
    type IntoIter = std::vec::IntoIter<Dependency<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, P> IntoIterator for &'a DependencyList<P> {
    type Item = &'a Dependency<P>;
    type IntoIter = std::slice::Iter<'a, Dependency<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
