// src/dag/order.rs

//! Deterministic orderings over the prerequisite graph.

use std::collections::{BTreeMap, BTreeSet};

use crate::dag::graph::{ensure_valid, CurriculumGraph, StructuralViolation};
use crate::model::Curriculum;

/// Kahn's algorithm over in-degree counts.
///
/// Among all nodes ready at a given moment the smallest id goes first, so
/// identical graphs always produce identical orders. Any structural
/// violation (duplicate ids, dangling or self references, a cycle) fails
/// before ordering starts, so no partial order is ever returned.
pub fn topological_order(curriculum: &Curriculum) -> Result<Vec<String>, StructuralViolation> {
    ensure_valid(curriculum)?;
    let graph = CurriculumGraph::new(curriculum);
    topological_order_of(&graph)
}

pub(crate) fn topological_order_of(
    graph: &CurriculumGraph<'_>,
) -> Result<Vec<String>, StructuralViolation> {
    let mut indegree: BTreeMap<&str, usize> =
        graph.ids().map(|id| (id, graph.in_degree(id))).collect();
    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut ordered = Vec::with_capacity(graph.len());
    while let Some(current) = ready.pop_first() {
        ordered.push(current.to_string());
        for dependent in graph.dependents_of(current) {
            if let Some(d) = indegree.get_mut(dependent) {
                *d -= 1;
                if *d == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if ordered.len() != graph.len() {
        let path = graph.find_cycle().unwrap_or_else(|| {
            // Kahn left nodes behind, so some remain with positive in-degree.
            indegree
                .iter()
                .filter(|(_, d)| **d > 0)
                .map(|(id, _)| id.to_string())
                .collect()
        });
        return Err(StructuralViolation::Cycle { path });
    }

    Ok(ordered)
}

/// Longest estimated-time prerequisite chain.
///
/// Single pass over the topological order carrying `(best predecessor,
/// cumulative minutes)` per node, then walked back from the terminal node
/// with the largest cumulative duration. Ties go to the smaller id both
/// when picking a predecessor and when picking the terminal node.
pub fn critical_path(curriculum: &Curriculum) -> Result<Vec<String>, StructuralViolation> {
    ensure_valid(curriculum)?;
    let graph = CurriculumGraph::new(curriculum);
    let ordered = topological_order_of(&graph)?;

    let mut best: BTreeMap<&str, (Option<&str>, f64)> = BTreeMap::new();
    for id in &ordered {
        let Some(node) = graph.node(id) else { continue };
        let own = node.estimate_minutes;

        let mut chosen: Option<(&str, f64)> = None;
        // dependencies_of is ascending, so strict `>` keeps the smaller id on ties.
        for prereq in graph.dependencies_of(id) {
            let Some(&(_, cumulative)) = best.get(prereq) else { continue };
            match chosen {
                Some((_, current)) if cumulative <= current => {}
                _ => chosen = Some((prereq, cumulative)),
            }
        }

        let (pred, base) = match chosen {
            Some((p, c)) => (Some(p), c),
            None => (None, 0.0),
        };
        best.insert(node.id.as_str(), (pred, base + own));
    }

    let mut end: Option<(&str, f64)> = None;
    for (&id, &(_, cumulative)) in &best {
        match end {
            Some((_, current)) if cumulative <= current => {}
            _ => end = Some((id, cumulative)),
        }
    }

    let mut path = Vec::new();
    let mut cursor = end.map(|(id, _)| id);
    while let Some(id) = cursor {
        path.push(id.to_string());
        cursor = best.get(id).and_then(|(pred, _)| *pred);
    }
    path.reverse();
    Ok(path)
}

/// Total minutes along a path of node ids.
pub fn path_minutes(curriculum: &Curriculum, path: &[String]) -> f64 {
    path.iter()
        .filter_map(|id| curriculum.node(id))
        .map(|n| n.estimate_minutes)
        .sum()
}
