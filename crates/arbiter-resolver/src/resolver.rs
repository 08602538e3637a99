//! Backtracking version search.
//!
//! Pending requirements are processed first in, first out. The first
//! requirement on a project creates a choice point: the candidate list is
//! fetched once, sorted newest first, and the first candidate that satisfies
//! every requirement placed on the project is chosen, preferring any
//! candidate rated [`Suitability::BestPossibleChoice`]. Later requirements on
//! an already decided project either keep the decision or rebind the project
//! to the first candidate that satisfies the grown requirement set; the
//! requirements the old version placed on others are retracted and anything
//! only it required is dropped.
//!
//! When no candidate fits, the search restores the state saved by the most
//! recent choice point and retries that project with its next untried
//! candidate. Choice points live on an explicit stack of snapshots over an
//! arena of project indices, so deep graphs never recurse.
//!
//! Rebinds inside a dependency cycle can lead back to a state the search has
//! already been in. Every state reached by a decision is fingerprinted onto a
//! trail that follows the current search path; reaching a state that is
//! already on the trail is a conflict like any other.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use arbiter_core::dependency::{DependencyList, Project};
use arbiter_core::registry::ResolverSettings;
use arbiter_core::requirement::{Requirement, Suitability};
use arbiter_core::selected::SelectedVersion;

use crate::cache::{CacheStats, FetchCache};
use crate::conflict::{Conflict, ConflictCause, ConflictKind, ConflictReport};
use crate::error::ResolveError;
use crate::graph::{Dependent, ResolvedDependencyGraph};
use crate::provider::DependencyProvider;

/// Iteration bound used when none is configured.
pub const DEFAULT_MAX_ITERATIONS: usize = 100_000;

/// Tunables for one [`Resolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Upper bound on search steps, backtracking included. Exceeding it fails
    /// with [`ResolveError::ResolutionDidNotTerminate`].
    pub max_iterations: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl ResolverConfig {
    pub fn from_settings(settings: &ResolverSettings) -> Self {
        Self {
            max_iterations: settings.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Origin {
    Root,
    Project(usize),
}

/// A requirement placed on a project, remembered with who placed it.
#[derive(Debug, Clone)]
struct Edge {
    origin: Origin,
    origin_version: Option<SelectedVersion>,
    requirement: Requirement,
}

#[derive(Debug, Clone)]
struct Pending {
    project: usize,
    edge: Edge,
}

#[derive(Debug, Clone)]
struct Decision {
    version: SelectedVersion,
    edges: Vec<Edge>,
}

#[derive(Debug, Clone, Default)]
struct SearchState {
    decisions: BTreeMap<usize, Decision>,
    pending: VecDeque<Pending>,
}

impl SearchState {
    /// Remove every requirement `origin` placed, decided or still pending.
    fn retract(&mut self, origin: usize) {
        let placed_by = |edge: &Edge| edge.origin == Origin::Project(origin);
        for decision in self.decisions.values_mut() {
            decision.edges.retain(|e| !placed_by(e));
        }
        self.pending.retain(|p| !placed_by(&p.edge));
    }

    /// Drop decisions no longer reachable from the root, along with the
    /// requirements they placed. Returns the dropped projects.
    fn prune(&mut self) -> Vec<usize> {
        let mut reachable = BTreeSet::new();
        loop {
            let before = reachable.len();
            for (&project, decision) in &self.decisions {
                if reachable.contains(&project) {
                    continue;
                }
                let required = decision.edges.iter().any(|e| match e.origin {
                    Origin::Root => true,
                    Origin::Project(origin) => reachable.contains(&origin),
                });
                if required {
                    reachable.insert(project);
                }
            }
            if reachable.len() == before {
                break;
            }
        }

        let dropped: Vec<usize> = self
            .decisions
            .keys()
            .filter(|p| !reachable.contains(*p))
            .copied()
            .collect();
        if dropped.is_empty() {
            return dropped;
        }
        for project in &dropped {
            self.decisions.remove(project);
        }
        let alive = |edge: &Edge| match edge.origin {
            Origin::Root => true,
            Origin::Project(origin) => reachable.contains(&origin),
        };
        for decision in self.decisions.values_mut() {
            decision.edges.retain(alive);
        }
        self.pending.retain(|p| alive(&p.edge));
        dropped
    }

    fn fingerprint(&self) -> Fingerprint {
        let key = |edge: &Edge| (edge.origin, edge.origin_version.clone());
        Fingerprint {
            decisions: self
                .decisions
                .iter()
                .map(|(&project, d)| (project, d.version.clone(), d.edges.iter().map(key).collect()))
                .collect(),
            pending: self
                .pending
                .iter()
                .map(|p| (p.project, key(&p.edge)))
                .collect(),
        }
    }
}

/// An edge identified by who placed it. The requirement itself is left out:
/// a dependent at a given version always places the same one.
type EdgeKey = (Origin, Option<SelectedVersion>);

/// Identity of a [`SearchState`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Fingerprint {
    decisions: Vec<(usize, SelectedVersion, Vec<EdgeKey>)>,
    pending: Vec<(usize, EdgeKey)>,
}

/// Fingerprints of the states on the current search path, oldest first.
#[derive(Debug, Default)]
struct Trail {
    path: Vec<Fingerprint>,
    seen: BTreeSet<Fingerprint>,
}

impl Trail {
    fn len(&self) -> usize {
        self.path.len()
    }

    /// Returns `false` if `state` is already on the path.
    fn enter(&mut self, state: &SearchState) -> bool {
        let fingerprint = state.fingerprint();
        if self.seen.contains(&fingerprint) {
            return false;
        }
        self.seen.insert(fingerprint.clone());
        self.path.push(fingerprint);
        true
    }

    /// Forget every state entered after the path was `len` long.
    fn rewind(&mut self, len: usize) {
        if len >= self.path.len() {
            return;
        }
        for fingerprint in self.path.drain(len..) {
            self.seen.remove(&fingerprint);
        }
    }
}

/// A saved state to return to, with the candidates already tried for the
/// project decided there.
struct ChoicePoint {
    project: usize,
    snapshot: SearchState,
    tried: BTreeSet<SelectedVersion>,
    /// Trail length to rewind to when returning here.
    trail: usize,
}

enum Step {
    Continue,
    Decided(ChoicePoint),
    Conflict(Conflict),
}

#[derive(Debug, PartialEq)]
enum Selection {
    Found(SelectedVersion),
    Exhausted,
    Divergent(SelectedVersion, SelectedVersion),
}

/// Resolves a root [`DependencyList`] against a [`DependencyProvider`].
///
/// `C` is an arbitrary caller context, handed to every provider callback and
/// readable through [`Resolver::context`].
pub struct Resolver<P: Project, D, C = ()> {
    provider: D,
    root: DependencyList<P>,
    context: C,
    config: ResolverConfig,
    cache: FetchCache<P>,
    projects: Vec<P>,
    index: HashMap<P, usize>,
    conflicts: ConflictReport,
    iterations: usize,
}

impl<P, D, C> Resolver<P, D, C>
where
    P: Project,
    D: DependencyProvider<P, C>,
{
    pub fn new(provider: D, root: DependencyList<P>, context: C) -> Self {
        Self {
            provider,
            root,
            context,
            config: ResolverConfig::default(),
            cache: FetchCache::new(),
            projects: Vec::new(),
            index: HashMap::new(),
            conflicts: ConflictReport::new(),
            iterations: 0,
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn provider(&self) -> &D {
        &self.provider
    }

    pub fn root(&self) -> &DependencyList<P> {
        &self.root
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Conflicts met by the last call to [`Resolver::resolve`], including
    /// those recovered by backtracking.
    pub fn conflicts(&self) -> &ConflictReport {
        &self.conflicts
    }

    /// Search steps taken by the last call to [`Resolver::resolve`].
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Callback traffic of the last call to [`Resolver::resolve`].
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Run the search. Each call starts from scratch, with an empty cache.
    pub fn resolve(&mut self) -> Result<ResolvedDependencyGraph<P>, ResolveError> {
        self.cache.clear();
        self.projects.clear();
        self.index.clear();
        self.conflicts = ConflictReport::new();
        self.iterations = 0;

        let mut state = SearchState::default();
        for dependency in self.root.clone() {
            let project = self.intern(&dependency.project);
            state.pending.push_back(Pending {
                project,
                edge: Edge {
                    origin: Origin::Root,
                    origin_version: None,
                    requirement: dependency.requirement,
                },
            });
        }

        let mut stack: Vec<ChoicePoint> = Vec::new();
        let mut trail = Trail::default();
        while !state.pending.is_empty() {
            self.tick()?;
            let conflict = match self.step(&mut state, &BTreeSet::new())? {
                Step::Continue => continue,
                Step::Decided(point) => match self.enter(&mut trail, &state, point) {
                    Ok(point) => {
                        stack.push(point);
                        continue;
                    }
                    Err((point, conflict)) => {
                        // Retry the same decision with its next candidate.
                        stack.push(point);
                        conflict
                    }
                },
                Step::Conflict(conflict) => conflict,
            };
            tracing::debug!("conflict: {conflict}");
            self.conflicts.add(conflict.clone());
            state = self.backtrack(&mut stack, &mut trail, conflict)?;
        }

        tracing::debug!(
            "resolved {} projects in {} iterations",
            state.decisions.len(),
            self.iterations
        );
        Ok(self.build_graph(&state))
    }

    fn tick(&mut self) -> Result<(), ResolveError> {
        self.iterations += 1;
        if self.iterations > self.config.max_iterations {
            return Err(ResolveError::ResolutionDidNotTerminate {
                iterations: self.config.max_iterations,
            });
        }
        if self.provider.should_cancel(&self.context) {
            return Err(ResolveError::Cancelled);
        }
        Ok(())
    }

    fn intern(&mut self, project: &P) -> usize {
        if let Some(&idx) = self.index.get(project) {
            return idx;
        }
        let idx = self.projects.len();
        self.projects.push(project.clone());
        self.index.insert(project.clone(), idx);
        idx
    }

    /// Pop choice points until one still has a candidate left. Fails with
    /// `conflict` once the stack is empty.
    fn backtrack(
        &mut self,
        stack: &mut Vec<ChoicePoint>,
        trail: &mut Trail,
        conflict: Conflict,
    ) -> Result<SearchState, ResolveError> {
        while let Some(point) = stack.pop() {
            self.tick()?;
            tracing::debug!("backtracking to {}", self.projects[point.project]);
            trail.rewind(point.trail);
            let mut state = point.snapshot;
            match self.step(&mut state, &point.tried)? {
                Step::Decided(next) => match self.enter(trail, &state, next) {
                    Ok(next) => {
                        stack.push(next);
                        return Ok(state);
                    }
                    Err((next, circular)) => {
                        tracing::trace!("{circular}");
                        stack.push(next);
                    }
                },
                Step::Continue => return Ok(state),
                Step::Conflict(exhausted) => {
                    tracing::trace!("choice point exhausted: {exhausted}");
                }
            }
        }
        Err(conflict.into())
    }

    /// Record the state reached by the decision at `point` on the trail.
    ///
    /// A state already on the trail hands the choice point back with a
    /// [`ConflictKind::Circular`] conflict; its tried set already excludes
    /// the version that led there.
    fn enter(
        &self,
        trail: &mut Trail,
        state: &SearchState,
        mut point: ChoicePoint,
    ) -> Result<ChoicePoint, (ChoicePoint, Conflict)> {
        point.trail = trail.len();
        if trail.enter(state) {
            return Ok(point);
        }
        let decision = state.decisions.get(&point.project);
        let previous = point
            .snapshot
            .decisions
            .get(&point.project)
            .map(|d| &d.version);
        let conflict = self.conflict(
            point.project,
            previous,
            decision.map(|d| d.edges.as_slice()).unwrap_or_default(),
            ConflictKind::Circular {
                version: decision.map(|d| d.version.to_string()).unwrap_or_default(),
            },
        );
        Err((point, conflict))
    }

    /// Process the pending requirement at the front of the queue.
    fn step(
        &mut self,
        state: &mut SearchState,
        tried: &BTreeSet<SelectedVersion>,
    ) -> Result<Step, ResolveError> {
        let Some(head) = state.pending.front() else {
            return Ok(Step::Continue);
        };
        let project = head.project;
        let current = state.decisions.get(&project).map(|d| d.version.clone());

        if let Some(version) = &current {
            if head.edge.requirement.satisfied_by(version).is_suitable() {
                if let Some(Pending { edge, .. }) = state.pending.pop_front() {
                    tracing::trace!(
                        "{} {version} still satisfies {}",
                        self.projects[project],
                        edge.requirement
                    );
                    if let Some(decision) = state.decisions.get_mut(&project) {
                        decision.edges.push(edge);
                    }
                }
                return Ok(Step::Continue);
            }
        }

        let snapshot = state.clone();
        let Some(Pending { edge, .. }) = state.pending.pop_front() else {
            return Ok(Step::Continue);
        };
        let self_conflict = current.is_some() && edge.origin == Origin::Project(project);
        let mut edges = state
            .decisions
            .get(&project)
            .map(|d| d.edges.clone())
            .unwrap_or_default();
        edges.push(edge);

        // A version whose own dependencies exclude it cannot be rebound away
        // from; only backtracking can fix that.
        if self_conflict {
            return Ok(Step::Conflict(self.conflict(
                project,
                current.as_ref(),
                &edges,
                ConflictKind::NoSuitableVersion,
            )));
        }

        let name = self.projects[project].clone();
        let candidates = self.candidates(&name, &edges)?;

        let version = match select(&candidates, &edges, tried) {
            Selection::Found(version) => version,
            Selection::Exhausted => {
                let kind = if candidates.is_empty() {
                    ConflictKind::NoVersions
                } else {
                    ConflictKind::NoSuitableVersion
                };
                return Ok(Step::Conflict(self.conflict(
                    project,
                    current.as_ref(),
                    &edges,
                    kind,
                )));
            }
            Selection::Divergent(first, second) => {
                let kind = ConflictKind::DivergentPins {
                    first: first.to_string(),
                    second: second.to_string(),
                };
                return Ok(Step::Conflict(self.conflict(
                    project,
                    current.as_ref(),
                    &edges,
                    kind,
                )));
            }
        };

        match &current {
            Some(previous) => {
                tracing::debug!("rebinding {name} from {previous} to {version}");
                edges.retain(|e| e.origin != Origin::Project(project));
                state.retract(project);
            }
            None => tracing::debug!("selected {name} {version}"),
        }
        state.decisions.insert(
            project,
            Decision {
                version: version.clone(),
                edges,
            },
        );
        for dropped in state.prune() {
            tracing::debug!("dropping {}, no longer required", self.projects[dropped]);
        }

        let dependencies =
            self.cache
                .dependencies(&self.provider, &self.context, &name, &version)?;
        for dependency in dependencies {
            let target = self.intern(&dependency.project);
            state.pending.push_back(Pending {
                project: target,
                edge: Edge {
                    origin: Origin::Project(project),
                    origin_version: Some(version.clone()),
                    requirement: dependency.requirement,
                },
            });
        }

        let mut tried = tried.clone();
        tried.insert(version);
        Ok(Step::Decided(ChoicePoint {
            project,
            snapshot,
            tried,
            trail: 0,
        }))
    }

    /// Enumerated candidates for `project`, plus any version the provider
    /// maps a custom requirement's context to.
    fn candidates(
        &mut self,
        project: &P,
        edges: &[Edge],
    ) -> Result<Vec<SelectedVersion>, ResolveError> {
        let mut candidates = self
            .cache
            .versions(&self.provider, &self.context, project)?;
        for edge in edges {
            for context in edge.requirement.custom_contexts() {
                let found =
                    self.cache
                        .version_for_metadata(&self.provider, &self.context, project, context);
                if let Some(found) = found {
                    if self.cache.append_candidate(project, found.clone()) {
                        tracing::debug!("{project}: {found} found through metadata {context}");
                        candidates.push(found);
                    }
                }
            }
        }
        Ok(candidates)
    }

    fn conflict(
        &self,
        project: usize,
        attempted: Option<&SelectedVersion>,
        edges: &[Edge],
        kind: ConflictKind,
    ) -> Conflict {
        let requirement = Requirement::compound(edges.iter().map(|e| e.requirement.clone()));
        Conflict {
            project: self.projects[project].to_string(),
            attempted: attempted.map(ToString::to_string),
            requirement: requirement.to_string(),
            chain: edges
                .iter()
                .map(|e| ConflictCause {
                    dependent: self.describe(e),
                    requirement: e.requirement.to_string(),
                })
                .collect(),
            kind,
        }
    }

    fn describe(&self, edge: &Edge) -> String {
        match (edge.origin, &edge.origin_version) {
            (Origin::Root, _) => "root".to_string(),
            (Origin::Project(idx), Some(version)) => format!("{} {version}", self.projects[idx]),
            (Origin::Project(idx), None) => self.projects[idx].to_string(),
        }
    }

    fn build_graph(&self, state: &SearchState) -> ResolvedDependencyGraph<P> {
        let mut graph = ResolvedDependencyGraph::new();
        for (&project, decision) in &state.decisions {
            graph.add_node(self.projects[project].clone(), decision.version.clone());
        }
        for (&project, decision) in &state.decisions {
            for edge in &decision.edges {
                let from = match edge.origin {
                    Origin::Root => Dependent::Root,
                    Origin::Project(idx) => Dependent::Project(self.projects[idx].clone()),
                };
                graph.add_edge(&from, &self.projects[project], edge.requirement.clone());
            }
        }
        graph
    }
}

/// Pick a candidate satisfying every edge, skipping `tried`.
///
/// The first candidate rated best possible wins; otherwise the first
/// suitable one. Two best-possible candidates each pinned by a different
/// edge are reported instead of picking one.
fn select(
    candidates: &[SelectedVersion],
    edges: &[Edge],
    tried: &BTreeSet<SelectedVersion>,
) -> Selection {
    let rated: Vec<(&SelectedVersion, Suitability)> = candidates
        .iter()
        .filter(|c| !tried.contains(*c))
        .map(|c| {
            let rating = Suitability::combine(edges.iter().map(|e| e.requirement.satisfied_by(c)));
            (c, rating)
        })
        .collect();

    let best: Vec<&SelectedVersion> = rated
        .iter()
        .filter(|(_, rating)| *rating == Suitability::BestPossibleChoice)
        .map(|(c, _)| *c)
        .collect();
    for (i, first) in best.iter().enumerate() {
        for second in &best[i + 1..] {
            if diverge(edges, first, second) {
                return Selection::Divergent((*first).clone(), (*second).clone());
            }
        }
    }
    if let Some(first) = best.first() {
        return Selection::Found((*first).clone());
    }

    rated
        .iter()
        .find(|(_, rating)| rating.is_suitable())
        .map(|(c, _)| Selection::Found((*c).clone()))
        .unwrap_or(Selection::Exhausted)
}

fn pins(edge: &Edge, version: &SelectedVersion, other: &SelectedVersion) -> bool {
    edge.requirement.satisfied_by(version) == Suitability::BestPossibleChoice
        && edge.requirement.satisfied_by(other) != Suitability::BestPossibleChoice
}

fn diverge(edges: &[Edge], a: &SelectedVersion, b: &SelectedVersion) -> bool {
    edges.iter().any(|e| pins(e, a, b)) && edges.iter().any(|e| pins(e, b, a))
}
