// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashSet};

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Dfs, Reversed};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{Curriculum, CurriculumNode};

/// A broken structural invariant of the curriculum graph.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum StructuralViolation {
    #[error("duplicate node id '{id}'")]
    DuplicateId { id: String },

    #[error("node '{node}' lists unknown prerequisite '{missing}'")]
    DanglingPrerequisite { node: String, missing: String },

    #[error("node '{node}' lists itself as a prerequisite")]
    SelfDependency { node: String },

    #[error("prerequisite cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

impl StructuralViolation {
    /// Node ids this violation refers to, in report order.
    pub fn node_ids(&self) -> Vec<String> {
        match self {
            StructuralViolation::DuplicateId { id } => vec![id.clone()],
            StructuralViolation::DanglingPrerequisite { node, missing } => {
                vec![node.clone(), missing.clone()]
            }
            StructuralViolation::SelfDependency { node } => vec![node.clone()],
            StructuralViolation::Cycle { path } => {
                let mut ids = path.clone();
                ids.pop();
                ids
            }
        }
    }
}

/// Prerequisite graph over a borrowed curriculum.
///
/// Edge direction is prerequisite -> dependent: for a node `B` listing
/// `A` in `prerequisites` we add `A -> B`. Dangling references and
/// self-edges are left out; [`validate`] reports them separately.
#[derive(Debug, Clone)]
pub struct CurriculumGraph<'a> {
    graph: DiGraphMap<&'a str, ()>,
    nodes: BTreeMap<&'a str, &'a CurriculumNode>,
}

impl<'a> CurriculumGraph<'a> {
    pub fn new(curriculum: &'a Curriculum) -> Self {
        let mut graph: DiGraphMap<&'a str, ()> = DiGraphMap::new();
        let nodes = curriculum.index();

        for &id in nodes.keys() {
            graph.add_node(id);
        }

        for node in &curriculum.nodes {
            for prereq in &node.prerequisites {
                if prereq == &node.id {
                    continue;
                }
                if let Some((&known, _)) = nodes.get_key_value(prereq.as_str()) {
                    graph.add_edge(known, node.id.as_str(), ());
                }
            }
        }

        Self { graph, nodes }
    }

    pub fn node(&self, id: &str) -> Option<&'a CurriculumNode> {
        self.nodes.get(id).copied()
    }

    /// All node ids, ascending.
    pub fn ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.nodes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolvable immediate prerequisites of `id`, ascending.
    pub fn dependencies_of(&self, id: &str) -> Vec<&'a str> {
        self.sorted_neighbors(id, Direction::Incoming)
    }

    /// Immediate dependents of `id`, ascending.
    pub fn dependents_of(&self, id: &str) -> Vec<&'a str> {
        self.sorted_neighbors(id, Direction::Outgoing)
    }

    pub fn in_degree(&self, id: &str) -> usize {
        let Some((&id, _)) = self.nodes.get_key_value(id) else {
            return 0;
        };
        self.graph.neighbors_directed(id, Direction::Incoming).count()
    }

    /// Every node that transitively depends on `id` (excluding `id`).
    pub fn reachable_from(&self, id: &str) -> BTreeSet<String> {
        let Some((&start, _)) = self.nodes.get_key_value(id) else {
            return BTreeSet::new();
        };
        let mut dfs = Dfs::new(&self.graph, start);
        let mut out = BTreeSet::new();
        while let Some(next) = dfs.next(&self.graph) {
            if next != start {
                out.insert(next.to_string());
            }
        }
        out
    }

    /// Every transitive prerequisite of `id` (excluding `id`).
    pub fn reachable_to(&self, id: &str) -> BTreeSet<String> {
        let Some((&start, _)) = self.nodes.get_key_value(id) else {
            return BTreeSet::new();
        };
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut out = BTreeSet::new();
        while let Some(next) = dfs.next(reversed) {
            if next != start {
                out.insert(next.to_string());
            }
        }
        out
    }

    /// Nodes without resolvable prerequisites, ascending.
    pub fn roots(&self) -> Vec<&'a str> {
        self.ids().filter(|id| self.in_degree(id) == 0).collect()
    }

    /// Longest edge count from any root. Assumes an acyclic graph; on a
    /// cycle the nodes inside it are simply not counted.
    pub fn max_depth(&self) -> usize {
        let mut indegree: BTreeMap<&str, usize> =
            self.ids().map(|id| (id, self.in_degree(id))).collect();
        let mut ready: Vec<&str> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut depth: BTreeMap<&str, usize> = ready.iter().map(|id| (*id, 0)).collect();

        while let Some(current) = ready.pop() {
            let current_depth = depth.get(current).copied().unwrap_or(0);
            for child in self.dependents_of(current) {
                let entry = depth.entry(child).or_insert(0);
                *entry = (*entry).max(current_depth + 1);
                if let Some(d) = indegree.get_mut(child) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(child);
                    }
                }
            }
        }

        depth.values().copied().max().unwrap_or(0)
    }

    /// First prerequisite cycle found by depth-first search.
    ///
    /// Starts from each node in ascending id order and follows
    /// prerequisite edges, keeping the current recursion stack. The first
    /// edge into a node already on the stack closes the cycle; the
    /// returned path starts and ends with that node.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited: HashSet<&str> = HashSet::new();

        for start in self.ids() {
            if visited.contains(start) {
                continue;
            }
            let mut stack: Vec<&str> = Vec::new();
            let mut on_stack: HashSet<&str> = HashSet::new();
            if let Some(path) = self.dfs_cycle(start, &mut visited, &mut stack, &mut on_stack) {
                debug!(path = ?path, "cycle detected in prerequisite graph");
                return Some(path);
            }
        }
        None
    }

    fn dfs_cycle(
        &self,
        id: &'a str,
        visited: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
        on_stack: &mut HashSet<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(id);
        stack.push(id);
        on_stack.insert(id);

        for prereq in self.dependencies_of(id) {
            if on_stack.contains(prereq) {
                let start = stack.iter().position(|s| *s == prereq).unwrap_or(0);
                let mut path: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
                path.push(prereq.to_string());
                return Some(path);
            }
            if !visited.contains(prereq) {
                if let Some(path) = self.dfs_cycle(prereq, visited, stack, on_stack) {
                    return Some(path);
                }
            }
        }

        stack.pop();
        on_stack.remove(id);
        None
    }

    fn sorted_neighbors(&self, id: &str, dir: Direction) -> Vec<&'a str> {
        // Graph queries take the stored `&'a str` key, not the caller's borrow.
        let Some((&id, _)) = self.nodes.get_key_value(id) else {
            return Vec::new();
        };
        let mut out: Vec<&'a str> = self.graph.neighbors_directed(id, dir).collect();
        out.sort_unstable();
        out
    }
}

/// Check every structural invariant of a curriculum.
///
/// Order: duplicate ids, then dangling and self references in node order,
/// then at most one cycle. An empty result means the graph is a valid DAG.
pub fn validate(curriculum: &Curriculum) -> Vec<StructuralViolation> {
    let mut violations = Vec::new();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported: HashSet<&str> = HashSet::new();
    for node in &curriculum.nodes {
        if !seen.insert(node.id.as_str()) && reported.insert(node.id.as_str()) {
            violations.push(StructuralViolation::DuplicateId {
                id: node.id.clone(),
            });
        }
    }

    for node in &curriculum.nodes {
        for prereq in &node.prerequisites {
            if prereq == &node.id {
                violations.push(StructuralViolation::SelfDependency {
                    node: node.id.clone(),
                });
            } else if !seen.contains(prereq.as_str()) {
                violations.push(StructuralViolation::DanglingPrerequisite {
                    node: node.id.clone(),
                    missing: prereq.clone(),
                });
            }
        }
    }

    if let Some(path) = CurriculumGraph::new(curriculum).find_cycle() {
        violations.push(StructuralViolation::Cycle { path });
    }

    violations
}

/// Fail fast with the first violation, for callers that require a DAG.
pub fn ensure_valid(curriculum: &Curriculum) -> Result<(), StructuralViolation> {
    match validate(curriculum).into_iter().next() {
        Some(violation) => Err(violation),
        None => Ok(()),
    }
}
