//! The resolved dependency graph and its traversals.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use arbiter_core::dependency::Project;
use arbiter_core::requirement::Requirement;
use arbiter_core::selected::SelectedVersion;

/// Who placed a requirement: the root dependency list or a resolved project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dependent<P> {
    Root,
    Project(P),
}

impl<P: fmt::Display> fmt::Display for Dependent<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependent::Root => f.write_str("root"),
            Dependent::Project(project) => write!(f, "{project}"),
        }
    }
}

/// A project and the version chosen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode<P> {
    pub project: P,
    pub version: SelectedVersion,
}

impl<P: fmt::Display> fmt::Display for ResolvedNode<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.project, self.version)
    }
}

#[derive(Debug, Clone)]
enum Node<P> {
    Root,
    Resolved(ResolvedNode<P>),
}

impl<P: fmt::Display> fmt::Display for Node<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Root => f.write_str("root"),
            Node::Resolved(node) => write!(f, "{node}"),
        }
    }
}

/// One chosen version per resolved project, with the requirement edges that
/// justified each choice.
///
/// Edges point from dependent to dependency and carry the requirement the
/// dependent placed. A virtual root node stands for the root dependency list.
/// Cycles are allowed and can be inspected with [`Self::cycles`].
#[derive(Debug, Clone)]
pub struct ResolvedDependencyGraph<P: Project> {
    graph: DiGraph<Node<P>, Requirement>,
    index: HashMap<P, NodeIndex>,
    root: NodeIndex,
}

impl<P: Project> ResolvedDependencyGraph<P> {
    pub(crate) fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(Node::Root);
        Self {
            graph,
            index: HashMap::new(),
            root,
        }
    }

    pub(crate) fn add_node(&mut self, project: P, version: SelectedVersion) -> NodeIndex {
        if let Some(&idx) = self.index.get(&project) {
            return idx;
        }
        let idx = self.graph.add_node(Node::Resolved(ResolvedNode {
            project: project.clone(),
            version,
        }));
        self.index.insert(project, idx);
        idx
    }

    /// Record that `from` placed `requirement` on `to`. Both ends must already
    /// be nodes; otherwise the edge is ignored.
    pub(crate) fn add_edge(&mut self, from: &Dependent<P>, to: &P, requirement: Requirement) {
        let from = match from {
            Dependent::Root => Some(self.root),
            Dependent::Project(project) => self.index.get(project).copied(),
        };
        if let (Some(from), Some(&to)) = (from, self.index.get(to)) {
            self.graph.add_edge(from, to, requirement);
        }
    }

    fn node(&self, project: &P) -> Option<&ResolvedNode<P>> {
        match &self.graph[*self.index.get(project)?] {
            Node::Resolved(node) => Some(node),
            Node::Root => None,
        }
    }

    fn dependent(&self, idx: NodeIndex) -> Dependent<P> {
        match &self.graph[idx] {
            Node::Root => Dependent::Root,
            Node::Resolved(node) => Dependent::Project(node.project.clone()),
        }
    }

    /// The version chosen for `project`.
    pub fn version_for(&self, project: &P) -> Option<&SelectedVersion> {
        self.node(project).map(|node| &node.version)
    }

    /// Every resolved project, ordered by project.
    pub fn projects(&self) -> Vec<&ResolvedNode<P>> {
        let mut nodes: Vec<&ResolvedNode<P>> = self
            .graph
            .node_weights()
            .filter_map(|node| match node {
                Node::Resolved(node) => Some(node),
                Node::Root => None,
            })
            .collect();
        nodes.sort_by(|a, b| a.project.cmp(&b.project));
        nodes
    }

    /// Every project that reaches `project` through recorded edges. Contains
    /// `project` itself when it sits on a cycle.
    pub fn dependents(&self, project: &P) -> BTreeSet<P> {
        let mut out = BTreeSet::new();
        let Some(&start) = self.index.get(project) else {
            return out;
        };
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(idx) = queue.pop_front() {
            for source in self.graph.neighbors_directed(idx, Direction::Incoming) {
                if let Node::Resolved(node) = &self.graph[source] {
                    out.insert(node.project.clone());
                }
                if seen.insert(source) {
                    queue.push_back(source);
                }
            }
        }
        out
    }

    /// Who placed a requirement directly on `project`.
    pub fn direct_dependents(&self, project: &P) -> Vec<Dependent<P>> {
        let mut out: Vec<Dependent<P>> = self
            .requirements_on(project)
            .into_iter()
            .map(|(dependent, _)| dependent)
            .collect();
        out.dedup();
        out
    }

    /// Direct dependencies of `project` with the requirement placed on each.
    pub fn dependencies_of(&self, project: &P) -> Vec<(&ResolvedNode<P>, &Requirement)> {
        match self.index.get(project) {
            Some(&idx) => strip_index(self.children(idx)),
            None => Vec::new(),
        }
    }

    /// Direct dependencies of the root dependency list.
    pub fn root_dependencies(&self) -> Vec<(&ResolvedNode<P>, &Requirement)> {
        strip_index(self.children(self.root))
    }

    fn children(&self, idx: NodeIndex) -> Vec<(NodeIndex, &ResolvedNode<P>, &Requirement)> {
        let mut out: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|e| match &self.graph[e.target()] {
                Node::Resolved(node) => Some((e.target(), node, e.weight())),
                Node::Root => None,
            })
            .collect();
        out.sort_by(|a, b| a.1.project.cmp(&b.1.project));
        out
    }

    /// Every edge into `project`: the dependent and the requirement it
    /// placed, ordered by dependent with the root first.
    pub fn requirements_on(&self, project: &P) -> Vec<(Dependent<P>, Requirement)> {
        let Some(&idx) = self.index.get(project) else {
            return Vec::new();
        };
        let mut out: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (self.dependent(e.source()), e.weight().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Groups of projects that depend on each other, including projects that
    /// depend on themselves. Each group and the list of groups are sorted.
    pub fn cycles(&self) -> Vec<Vec<P>> {
        let mut out: Vec<Vec<P>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0])
            })
            .map(|scc| {
                let mut members: Vec<P> = scc
                    .into_iter()
                    .filter_map(|idx| match &self.graph[idx] {
                        Node::Resolved(node) => Some(node.project.clone()),
                        Node::Root => None,
                    })
                    .collect();
                members.sort();
                members
            })
            .collect();
        out.sort();
        out
    }

    /// A path of resolved nodes from a root dependency down to `project`.
    pub fn find_path(&self, project: &P) -> Option<Vec<&ResolvedNode<P>>> {
        let target = *self.index.get(project)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if !self.dfs_path(self.root, target, &mut path, &mut visited) {
            return None;
        }
        Some(
            path.iter()
                .filter_map(|&idx| match &self.graph[idx] {
                    Node::Resolved(node) => Some(node),
                    Node::Root => None,
                })
                .collect(),
        )
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        let mut next: Vec<NodeIndex> = self.graph.neighbors(current).collect();
        next.sort_by(|a, b| self.dependent(*a).cmp(&self.dependent(*b)));
        for child in next {
            if self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// Render the graph as an indented tree below `root`.
    ///
    /// A project already on the current branch is printed but not expanded
    /// again, so cycles terminate.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::from("root\n");
        let mut visited = HashSet::from([self.root]);
        let children = self.children(self.root);
        let count = children.len();
        for (i, (idx, _, requirement)) in children.into_iter().enumerate() {
            self.print_subtree(
                &mut output,
                idx,
                requirement,
                "",
                i == count - 1,
                1,
                max_depth,
                &mut visited,
            );
        }
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        requirement: &Requirement,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        let repeated = visited.contains(&idx);
        output.push_str(&format!(
            "{prefix}{connector}{node} [{requirement}]{}\n",
            if repeated { " (*)" } else { "" }
        ));

        if repeated || max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        visited.insert(idx);

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let children = self.children(idx);
        let count = children.len();
        for (i, (child_idx, _, requirement)) in children.into_iter().enumerate() {
            self.print_subtree(
                output,
                child_idx,
                requirement,
                &child_prefix,
                i == count - 1,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// Render who depends on `project`, transitively, up to the root.
    pub fn print_inverted_tree(&self, project: &P) -> String {
        let mut output = String::new();
        let Some(&idx) = self.index.get(project) else {
            return output;
        };
        output.push_str(&format!("{}\n", self.graph[idx]));

        let mut visited = HashSet::from([idx]);
        let parents = self.parents(idx);
        let count = parents.len();
        for (i, parent) in parents.into_iter().enumerate() {
            self.print_inverted_subtree(&mut output, parent, "", i == count - 1, &mut visited);
        }
        output
    }

    fn parents(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut parents: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        parents.sort_by(|a, b| self.dependent(*a).cmp(&self.dependent(*b)));
        parents.dedup();
        parents
    }

    fn print_inverted_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.graph[idx]));

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let parents = self.parents(idx);
        let count = parents.len();
        for (i, parent) in parents.into_iter().enumerate() {
            self.print_inverted_subtree(output, parent, &child_prefix, i == count - 1, visited);
        }

        visited.remove(&idx);
    }

    /// Number of resolved projects.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn strip_index<N, R>(children: Vec<(NodeIndex, N, R)>) -> Vec<(N, R)> {
    children.into_iter().map(|(_, node, req)| (node, req)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::version::SemanticVersion;

    fn sv(s: &str) -> SelectedVersion {
        SemanticVersion::parse(s).unwrap().into()
    }

    fn req(s: &str) -> Requirement {
        s.parse().unwrap()
    }

    /// root -> app, root -> log; app -> log, app -> json; json -> app.
    fn sample() -> ResolvedDependencyGraph<&'static str> {
        let mut g = ResolvedDependencyGraph::new();
        g.add_node("app", sv("1.0.0"));
        g.add_node("log", sv("0.4.2"));
        g.add_node("json", sv("2.1.0"));
        g.add_edge(&Dependent::Root, &"app", req(">=1.0.0"));
        g.add_edge(&Dependent::Root, &"log", req("*"));
        g.add_edge(&Dependent::Project("app"), &"log", req("^0.4.0"));
        g.add_edge(&Dependent::Project("app"), &"json", req("~>2.0.0"));
        g.add_edge(&Dependent::Project("json"), &"app", req("*"));
        g
    }

    #[test]
    fn version_lookup() {
        let g = sample();
        assert_eq!(g.version_for(&"log"), Some(&sv("0.4.2")));
        assert!(g.version_for(&"missing").is_none());
        assert_eq!(g.len(), 3);
        assert!(!g.is_empty());
    }

    #[test]
    fn duplicate_add_returns_same_index() {
        let mut g = ResolvedDependencyGraph::new();
        let a = g.add_node("a", sv("1.0.0"));
        let b = g.add_node("a", sv("1.0.0"));
        assert_eq!(a, b);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn projects_are_sorted() {
        let g = sample();
        let names: Vec<_> = g.projects().iter().map(|n| n.project).collect();
        assert_eq!(names, vec!["app", "json", "log"]);
    }

    #[test]
    fn transitive_dependents() {
        let g = sample();
        let deps = g.dependents(&"log");
        assert_eq!(deps.into_iter().collect::<Vec<_>>(), vec!["app", "json"]);
        // app is on a cycle with json, so it reaches itself.
        assert!(g.dependents(&"app").contains(&"app"));
    }

    #[test]
    fn direct_dependents_and_requirements() {
        let g = sample();
        assert_eq!(
            g.direct_dependents(&"log"),
            vec![Dependent::Root, Dependent::Project("app")]
        );
        let reqs = g.requirements_on(&"log");
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[1].1.to_string(), "^0.4.0");
    }

    #[test]
    fn dependencies_of_project() {
        let g = sample();
        let deps: Vec<_> = g
            .dependencies_of(&"app")
            .into_iter()
            .map(|(n, r)| format!("{} {r}", n.project))
            .collect();
        assert_eq!(deps, vec!["json ~>2.0.0", "log ^0.4.0"]);
        assert_eq!(g.root_dependencies().len(), 2);
    }

    #[test]
    fn cycle_detection() {
        let g = sample();
        assert!(g.has_cycles());
        assert_eq!(g.cycles(), vec![vec!["app", "json"]]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut g = ResolvedDependencyGraph::new();
        g.add_node("a", sv("1.0.0"));
        g.add_edge(&Dependent::Root, &"a", req("*"));
        g.add_edge(&Dependent::Project("a"), &"a", req(">=1.0.0"));
        assert!(g.has_cycles());
        assert_eq!(g.cycles(), vec![vec!["a"]]);
    }

    #[test]
    fn acyclic_graph() {
        let mut g = ResolvedDependencyGraph::new();
        g.add_node("a", sv("1.0.0"));
        g.add_node("b", sv("1.0.0"));
        g.add_edge(&Dependent::Root, &"a", req("*"));
        g.add_edge(&Dependent::Project("a"), &"b", req("*"));
        assert!(!g.has_cycles());
        assert!(g.cycles().is_empty());
    }

    #[test]
    fn tree_printing() {
        let g = sample();
        let tree = g.print_tree(None);
        assert!(tree.starts_with("root\n"));
        assert!(tree.contains("├── app 1.0.0 [>=1.0.0]"));
        assert!(tree.contains("json 2.1.0 [~>2.0.0]"));
        assert!(tree.contains("app 1.0.0 [*] (*)"));
        assert!(tree.contains("└── log 0.4.2 [*]"));
    }

    #[test]
    fn tree_depth_limit() {
        let g = sample();
        let tree = g.print_tree(Some(1));
        assert!(tree.contains("app 1.0.0"));
        assert!(!tree.contains("json"));
    }

    #[test]
    fn find_path_exists() {
        let g = sample();
        let path = g.find_path(&"json").unwrap();
        let names: Vec<_> = path.iter().map(|n| n.project).collect();
        assert_eq!(names, vec!["app", "json"]);
    }

    #[test]
    fn find_path_not_found() {
        let g = sample();
        assert!(g.find_path(&"missing").is_none());
    }

    #[test]
    fn inverted_tree() {
        let g = sample();
        let inv = g.print_inverted_tree(&"json");
        assert!(inv.starts_with("json 2.1.0\n"));
        assert!(inv.contains("└── app 1.0.0"));
        assert!(inv.contains("root"));
        assert!(g.print_inverted_tree(&"missing").is_empty());
    }
}
