//! Package dependency graph
//!
//! Nodes live in an arena keyed by case-insensitive package identity and
//! refer to their children by key, so diamonds and cycles in the lock
//! document never produce shared ownership. Every traversal carries its
//! own visited set.

use super::{Dependency, VersionRange};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Case-insensitive package identity
#[derive(Debug, Clone)]
pub struct PackageKey {
    name: String,
    folded: String,
}

impl PackageKey {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let folded = name.to_lowercase();
        Self { name, folded }
    }

    /// The name as first spelled
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for PackageKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for PackageKey {}

impl Hash for PackageKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A parent-to-child edge with the range the parent declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub child: PackageKey,
    pub range: Option<VersionRange>,
}

/// A graph node; equality and hashing use the key only
#[derive(Debug, Clone)]
pub struct DependencyNode {
    key: PackageKey,
    pub dependency: Dependency,
    children: Vec<DependencyEdge>,
}

impl DependencyNode {
    pub fn new(dependency: Dependency) -> Self {
        Self {
            key: PackageKey::new(dependency.name.clone()),
            dependency,
            children: Vec::new(),
        }
    }

    pub fn key(&self) -> &PackageKey {
        &self.key
    }

    pub fn children(&self) -> &[DependencyEdge] {
        &self.children
    }
}

impl PartialEq for DependencyNode {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DependencyNode {}

impl Hash for DependencyNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// A node reached by [`DependencyGraph::walk_transitive`]
#[derive(Debug, Clone, Copy)]
pub struct TransitiveVisit<'a> {
    pub key: &'a PackageKey,
    /// Edges from the nearest root
    pub depth: usize,
    /// Range declared by the parent that first reached this node
    pub range: Option<&'a VersionRange>,
    /// The node itself, absent when the graph names a child it has no entry for
    pub node: Option<&'a DependencyNode>,
}

/// Arena of dependency nodes
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashMap<PackageKey, DependencyNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, keeping the first node inserted for a key
    pub fn insert(&mut self, dependency: Dependency) -> &mut DependencyNode {
        let node = DependencyNode::new(dependency);
        self.nodes.entry(node.key.clone()).or_insert(node)
    }

    /// Record that `parent` depends on `child`. Duplicate edges are ignored.
    pub fn add_edge(&mut self, parent: &PackageKey, child: PackageKey, range: Option<VersionRange>) {
        if let Some(node) = self.nodes.get_mut(parent) {
            if !node.children.iter().any(|edge| edge.child == child) {
                node.children.push(DependencyEdge { child, range });
            }
        }
    }

    pub fn get(&self, key: &PackageKey) -> Option<&DependencyNode> {
        self.nodes.get(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Breadth-first walk from `roots`, yielding every node not among the
    /// roots whose shortest distance from a root is at most `max_depth`.
    ///
    /// Each node is yielded once, at its shortest depth.
    pub fn walk_transitive<'a>(
        &'a self,
        roots: &'a [PackageKey],
        max_depth: usize,
    ) -> Vec<TransitiveVisit<'a>> {
        let mut visited: HashSet<&PackageKey> = roots.iter().collect();
        let mut queue: VecDeque<(&PackageKey, usize)> = roots.iter().map(|k| (k, 0)).collect();
        let mut visits = Vec::new();

        while let Some((key, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            for edge in &node.children {
                if !visited.insert(&edge.child) {
                    continue;
                }
                visits.push(TransitiveVisit {
                    key: &edge.child,
                    depth: depth + 1,
                    range: edge.range.as_ref(),
                    node: self.nodes.get(&edge.child),
                });
                queue.push_back((&edge.child, depth + 1));
            }
        }

        visits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (parent, child) in edges {
            graph.insert(Dependency::new(*parent, None));
            graph.insert(Dependency::new(*child, None));
        }
        for (parent, child) in edges {
            graph.add_edge(&PackageKey::new(*parent), PackageKey::new(*child), None);
        }
        graph
    }

    fn names(visits: &[TransitiveVisit<'_>]) -> Vec<String> {
        visits.iter().map(|v| v.key.name().to_string()).collect()
    }

    #[test]
    fn test_package_key_case_insensitive() {
        assert_eq!(PackageKey::new("Newtonsoft.Json"), PackageKey::new("newtonsoft.json"));
        let mut set = HashSet::new();
        set.insert(PackageKey::new("A"));
        assert!(set.contains(&PackageKey::new("a")));
    }

    #[test]
    fn test_node_equality_uses_key_only() {
        let a = DependencyNode::new(Dependency::new("Pkg", None).with_transitive(true));
        let b = DependencyNode::new(Dependency::new("PKG", None));
        assert_eq!(a, b);
    }

    #[test]
    fn test_walk_respects_depth() {
        let graph = graph(&[("A", "B"), ("B", "C"), ("C", "D")]);
        let roots = vec![PackageKey::new("A")];
        assert_eq!(names(&graph.walk_transitive(&roots, 1)), vec!["B"]);
        assert_eq!(names(&graph.walk_transitive(&roots, 2)), vec!["B", "C"]);
        assert!(graph.walk_transitive(&roots, 0).is_empty());
    }

    #[test]
    fn test_walk_diamond_visits_once() {
        let graph = graph(&[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]);
        let roots = vec![PackageKey::new("A")];
        let visits = graph.walk_transitive(&roots, 5);
        assert_eq!(names(&visits), vec!["B", "C", "D"]);
        assert_eq!(visits[2].depth, 2);
    }

    #[test]
    fn test_walk_survives_cycle() {
        let graph = graph(&[("A", "B"), ("B", "A")]);
        let roots = vec![PackageKey::new("A")];
        assert_eq!(names(&graph.walk_transitive(&roots, 10)), vec!["B"]);
    }

    #[test]
    fn test_walk_uses_shortest_depth_across_roots() {
        // D is two edges from A but one edge from the direct dependency E
        let graph = graph(&[("A", "B"), ("B", "D"), ("E", "D")]);
        let roots = vec![PackageKey::new("A"), PackageKey::new("E")];
        let visits = graph.walk_transitive(&roots, 1);
        assert_eq!(names(&visits), vec!["B", "D"]);
        assert!(visits.iter().all(|v| v.depth == 1));
    }

    #[test]
    fn test_walk_skips_roots() {
        let graph = graph(&[("A", "B")]);
        let roots = vec![PackageKey::new("A"), PackageKey::new("b")];
        assert!(graph.walk_transitive(&roots, 3).is_empty());
    }
}
