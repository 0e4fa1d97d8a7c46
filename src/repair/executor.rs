// src/repair/executor.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::dag::graph::{validate, CurriculumGraph};
use crate::dag::order::topological_order;
use crate::engine::RetryBudget;
use crate::model::Curriculum;
use crate::proposal::{FailureKind, Proposer, RegenerationFailure};
use crate::quality::content::median;
use crate::quality::QualityReport;
use crate::repair::action::{ActionOutcome, AppliedAction, RepairAction, RepairKind};

fn round_to_five(minutes: f64) -> f64 {
    ((minutes / 5.0).round() * 5.0).max(5.0)
}

/// Applies planned actions to a curriculum in order.
///
/// Deterministic mutations never leave the graph structurally invalid
/// when it was valid before. Regeneration goes through the proposer and
/// is only merged when the merged graph still validates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepairExecutor;

impl RepairExecutor {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(
        &self,
        curriculum: &mut Curriculum,
        actions: &[RepairAction],
        report: &QualityReport,
        proposer: &mut dyn Proposer,
        budget: &mut RetryBudget,
    ) -> Vec<AppliedAction> {
        let mut applied = Vec::with_capacity(actions.len());

        for action in actions {
            let outcome = match &action.kind {
                RepairKind::RegenerateNode { .. } => match action.target.as_deref() {
                    Some(target) => regenerate(curriculum, target, report, proposer, budget),
                    None => ActionOutcome::Noop,
                },
                kind => {
                    if mutate(curriculum, kind, action.target.as_deref()) {
                        ActionOutcome::Applied { attempts: 1 }
                    } else {
                        ActionOutcome::Noop
                    }
                }
            };

            debug!(
                kind = action.kind.name(),
                target = action.target.as_deref().unwrap_or("-"),
                outcome = ?outcome,
                "repair action applied"
            );
            applied.push(AppliedAction {
                action: action.clone(),
                outcome,
            });

            if budget.is_exhausted() {
                break;
            }
        }

        applied
    }
}

/// Deterministic mutation. Returns whether the curriculum changed.
fn mutate(curriculum: &mut Curriculum, kind: &RepairKind, target: Option<&str>) -> bool {
    match kind {
        RepairKind::DropDanglingPrereqs => drop_dangling(curriculum, target),
        RepairKind::DropSelfDependency => target.is_some_and(|t| drop_self(curriculum, t)),
        RepairKind::BreakCycle { from, to } => remove_prereq(curriculum, to, from),
        RepairKind::RenameDuplicate => target.is_some_and(|t| rename_duplicates(curriculum, t)),
        RepairKind::AttachPredecessor => target.is_some_and(|t| attach_predecessor(curriculum, t)),
        RepairKind::TrimPrereqs { keep } => target.is_some_and(|t| trim_prereqs(curriculum, t, *keep)),
        RepairKind::ChainRoots => chain_roots(curriculum),
        RepairKind::RetimeNode => target.is_some_and(|t| retime_node(curriculum, t)),
        RepairKind::RebalanceEstimates => rebalance_estimates(curriculum),
        RepairKind::ScaleEstimates {
            min_minutes,
            max_minutes,
        } => scale_estimates(curriculum, f64::from(*min_minutes), f64::from(*max_minutes)),
        RepairKind::RegenerateNode { .. } => false,
    }
}

fn drop_dangling(curriculum: &mut Curriculum, target: Option<&str>) -> bool {
    let known: BTreeSet<String> = curriculum.nodes.iter().map(|n| n.id.clone()).collect();
    let mut changed = false;
    for node in curriculum.nodes.iter_mut() {
        if target.is_some_and(|t| t != node.id) {
            continue;
        }
        let before = node.prerequisites.len();
        node.prerequisites.retain(|p| known.contains(p));
        changed |= node.prerequisites.len() != before;
    }
    changed
}

fn drop_self(curriculum: &mut Curriculum, target: &str) -> bool {
    let Some(node) = curriculum.node_mut(target) else {
        return false;
    };
    let before = node.prerequisites.len();
    node.prerequisites.retain(|p| p != target);
    node.prerequisites.len() != before
}

fn remove_prereq(curriculum: &mut Curriculum, node_id: &str, prereq: &str) -> bool {
    let Some(node) = curriculum.node_mut(node_id) else {
        return false;
    };
    let before = node.prerequisites.len();
    node.prerequisites.retain(|p| p != prereq);
    node.prerequisites.len() != before
}

fn rename_duplicates(curriculum: &mut Curriculum, target: &str) -> bool {
    let mut taken: BTreeSet<String> = curriculum.nodes.iter().map(|n| n.id.clone()).collect();
    let mut seen_first = false;
    let mut changed = false;

    for node in curriculum.nodes.iter_mut().filter(|n| n.id == target) {
        if !seen_first {
            seen_first = true;
            continue;
        }
        let mut n = 2;
        while taken.contains(&format!("{target}-{n}")) {
            n += 1;
        }
        node.id = format!("{target}-{n}");
        taken.insert(node.id.clone());
        changed = true;
    }
    changed
}

/// Attach the nearest node before `target` in topological order, or
/// failing that the nearest later node that does not depend on it.
fn attach_predecessor(curriculum: &mut Curriculum, target: &str) -> bool {
    let Ok(order) = topological_order(curriculum) else {
        return false;
    };
    let Some(pos) = order.iter().position(|id| id == target) else {
        return false;
    };

    let candidate = if pos > 0 {
        Some(order[pos - 1].clone())
    } else {
        let dependents = CurriculumGraph::new(curriculum).reachable_from(target);
        order[pos + 1..]
            .iter()
            .find(|id| !dependents.contains(*id))
            .cloned()
    };

    match (candidate, curriculum.node_mut(target)) {
        (Some(pred), Some(node)) if !node.prerequisites.contains(&pred) => {
            node.prerequisites.push(pred);
            true
        }
        _ => false,
    }
}

fn trim_prereqs(curriculum: &mut Curriculum, target: &str, keep: usize) -> bool {
    let Some(node) = curriculum.node_mut(target) else {
        return false;
    };
    if node.prerequisites.len() <= keep {
        return false;
    }
    node.prerequisites.sort();
    node.prerequisites.truncate(keep);
    true
}

/// Chain the roots in ascending id order. With a single root the depth-1
/// level is chained instead, which deepens a star-shaped graph.
fn chain_roots(curriculum: &mut Curriculum) -> bool {
    let level: Vec<String> = {
        let graph = CurriculumGraph::new(curriculum);
        let roots: Vec<&str> = graph.roots();
        if roots.len() > 1 {
            roots.iter().map(|s| s.to_string()).collect()
        } else {
            let first_level: BTreeSet<&str> = roots
                .iter()
                .flat_map(|r| graph.dependents_of(r))
                .filter(|id| graph.dependencies_of(id).len() == 1)
                .collect();
            first_level.into_iter().map(str::to_string).collect()
        }
    };

    if level.len() < 2 {
        return false;
    }

    for pair in level.windows(2) {
        if let Some(node) = curriculum.node_mut(&pair[1]) {
            if !node.prerequisites.contains(&pair[0]) {
                node.prerequisites.push(pair[0].clone());
            }
        }
    }
    true
}

/// Cap the estimate at twice the larger of the median and the
/// prerequisite peak; repair invalid values to that median.
fn retime_node(curriculum: &mut Curriculum, target: &str) -> bool {
    let estimates: Vec<f64> = curriculum
        .nodes
        .iter()
        .map(|n| n.estimate_minutes)
        .filter(|m| m.is_finite() && *m >= 0.0)
        .collect();
    let med = median(&estimates);

    let index = curriculum.index();
    let Some(node) = index.get(target) else {
        return false;
    };
    let peak = node
        .prerequisites
        .iter()
        .filter_map(|p| index.get(p.as_str()))
        .map(|p| p.estimate_minutes)
        .filter(|m| m.is_finite())
        .fold(0.0_f64, f64::max);
    let current = node.estimate_minutes;
    let confidence = node.estimate_confidence;

    let anchor = med.max(peak);
    let fallback = if med > 0.0 { med } else { 30.0 };
    let new_estimate = if !current.is_finite() || current < 0.0 {
        round_to_five(fallback)
    } else if anchor > 0.0 && current > anchor * 2.0 {
        round_to_five(anchor * 2.0)
    } else {
        current
    };
    let new_confidence = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.5
    };

    let Some(node) = curriculum.node_mut(target) else {
        return false;
    };
    let changed = new_estimate != node.estimate_minutes || new_confidence != node.estimate_confidence;
    node.estimate_minutes = new_estimate;
    node.estimate_confidence = new_confidence;
    changed
}

/// Re-spread the total estimate with a ramp over graph depth and
/// topological position, rounded to five minutes.
fn rebalance_estimates(curriculum: &mut Curriculum) -> bool {
    let Ok(order) = topological_order(curriculum) else {
        return false;
    };
    let total: f64 = curriculum
        .nodes
        .iter()
        .map(|n| n.estimate_minutes)
        .filter(|m| m.is_finite() && *m >= 0.0)
        .sum();
    if total <= 0.0 || order.is_empty() {
        return false;
    }

    let mut depth: BTreeMap<String, usize> = BTreeMap::new();
    for id in &order {
        let d = curriculum
            .node(id)
            .map(|n| {
                n.prerequisites
                    .iter()
                    .filter_map(|p| depth.get(p))
                    .map(|d| d + 1)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        depth.insert(id.clone(), d);
    }

    let weights: Vec<(String, f64)> = order
        .iter()
        .enumerate()
        .map(|(pos, id)| {
            let d = depth.get(id).copied().unwrap_or(0) as f64;
            (id.clone(), 1.0 + 0.15 * d + 0.05 * (pos % 3) as f64)
        })
        .collect();
    let weight_sum: f64 = weights.iter().map(|(_, w)| w).sum();

    let mut changed = false;
    for (id, weight) in weights {
        if let Some(node) = curriculum.node_mut(&id) {
            let estimate = round_to_five(total * weight / weight_sum);
            changed |= estimate != node.estimate_minutes;
            node.estimate_minutes = estimate;
        }
    }
    changed
}

/// Scale valid estimates proportionally so their total sits at the middle
/// of `[min, max]`. A total already inside the range is left alone; an
/// all-zero total is spread evenly.
fn scale_estimates(curriculum: &mut Curriculum, min: f64, max: f64) -> bool {
    let valid = |m: f64| m.is_finite() && m >= 0.0;
    let count = curriculum
        .nodes
        .iter()
        .filter(|n| valid(n.estimate_minutes))
        .count();
    let total: f64 = curriculum
        .nodes
        .iter()
        .map(|n| n.estimate_minutes)
        .filter(|m| valid(*m))
        .sum();
    if count == 0 || max < min || (min..=max).contains(&total) {
        return false;
    }

    let target = (min + max) / 2.0;
    let mut changed = false;
    for node in curriculum.nodes.iter_mut().filter(|n| valid(n.estimate_minutes)) {
        let estimate = if total > 0.0 {
            round_to_five(node.estimate_minutes * target / total)
        } else {
            round_to_five(target / count as f64)
        };
        changed |= estimate != node.estimate_minutes;
        node.estimate_minutes = estimate;
    }
    changed
}

/// One targeted regeneration with retry-budget accounting.
fn regenerate(
    curriculum: &mut Curriculum,
    target: &str,
    report: &QualityReport,
    proposer: &mut dyn Proposer,
    budget: &mut RetryBudget,
) -> ActionOutcome {
    if curriculum.node(target).is_none() {
        return ActionOutcome::Noop;
    }
    let diagnostics = report.for_node(target);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let context = curriculum.context();

        let failure = match proposer.regenerate_node(target, &diagnostics, &context) {
            Ok(node) if node.id != target => RegenerationFailure::new(
                FailureKind::Malformed,
                format!("asked for node '{target}', got '{}'", node.id),
            ),
            Ok(node) => {
                let mut merged = curriculum.clone();
                if let Some(slot) = merged.node_mut(target) {
                    *slot = node;
                }
                let violations = validate(&merged);
                if violations.is_empty() {
                    if merged == *curriculum {
                        return ActionOutcome::Noop;
                    }
                    *curriculum = merged;
                    return ActionOutcome::Applied { attempts };
                }
                RegenerationFailure::new(
                    FailureKind::Rejected,
                    format!("regenerated node breaks the graph: {}", violations[0]),
                )
            }
            Err(failure) => failure,
        };

        warn!(node = target, attempt = attempts, error = %failure, "node regeneration failed");
        if !budget.try_consume() {
            return ActionOutcome::Failed {
                reason: failure.to_string(),
                attempts,
            };
        }
    }
}
