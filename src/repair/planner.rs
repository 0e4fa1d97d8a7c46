// src/repair/planner.rs

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::debug;

use crate::quality::{Diagnostic, QualityReport, Rule};
use crate::repair::action::{RepairAction, RepairKind};

/// Which nodes of a diagnostic an action is aimed at.
#[derive(Debug, Clone, Copy)]
enum Targets {
    /// One action per node id in the diagnostic.
    EachNode,
    /// The first node id only (dangling references carry `[node, missing]`).
    FirstNode,
    /// The last node id only.
    LastNode,
    /// One graph-wide action.
    Graph,
}

fn regenerate(
    rule: Rule,
    priority: u8,
    targets: Targets,
) -> Option<(RepairKind, u8, Targets)> {
    Some((RepairKind::RegenerateNode { rules: vec![rule] }, priority, targets))
}

/// Static rule table: action kind, per-rule priority and targeting.
///
/// `None` means no targeted repair exists; the rule only clears with a
/// different draft.
fn action_for(
    diagnostic: &Diagnostic,
    max_prereqs: usize,
    total_minutes: Option<(u32, u32)>,
) -> Option<(RepairKind, u8, Targets)> {
    use Targets::*;

    let rule = diagnostic.rule;
    match rule {
        Rule::EmptyCurriculum | Rule::NodeCount => None,
        Rule::TotalHours => total_minutes.map(|(min_minutes, max_minutes)| {
            let kind = RepairKind::ScaleEstimates {
                min_minutes,
                max_minutes,
            };
            (kind, 1, Graph)
        }),
        Rule::DuplicateNodeIds => Some((RepairKind::RenameDuplicate, 0, EachNode)),
        Rule::Cycle => {
            // node_ids run along prerequisite edges; the last one lists the
            // first, which closes the cycle.
            let from = diagnostic.node_ids.first().cloned().unwrap_or_default();
            let to = diagnostic.node_ids.last().cloned().unwrap_or_default();
            Some((RepairKind::BreakCycle { from, to }, 0, LastNode))
        }
        Rule::MissingPrerequisite => Some((RepairKind::DropDanglingPrereqs, 1, FirstNode)),
        Rule::SelfDependency => Some((RepairKind::DropSelfDependency, 1, EachNode)),
        Rule::InvalidEstimate => Some((RepairKind::RetimeNode, 1, EachNode)),
        Rule::ResourceMissing | Rule::NonActionableTask | Rule::NonMeasurableCriteria => {
            regenerate(rule, 2, EachNode)
        }
        Rule::HiddenPrerequisite => Some((RepairKind::AttachPredecessor, 2, EachNode)),
        Rule::AllRoots | Rule::DepthTooShallow => Some((RepairKind::ChainRoots, 3, Graph)),
        Rule::PrerequisiteOverload => {
            Some((RepairKind::TrimPrereqs { keep: max_prereqs }, 3, EachNode))
        }
        Rule::AtomicityThreshold => regenerate(Rule::CompoundCapability, 4, EachNode),
        Rule::FlatDistribution => Some((RepairKind::RebalanceEstimates, 4, Graph)),
        Rule::EffortOutlier => Some((RepairKind::RetimeNode, 4, EachNode)),
        Rule::CompoundCapability => regenerate(rule, 5, EachNode),
        Rule::WorkloadJump => Some((RepairKind::RetimeNode, 5, EachNode)),
        Rule::WeakRelevance | Rule::ConceptJump => regenerate(rule, 6, EachNode),
        Rule::TemplateSimilarity => regenerate(rule, 6, LastNode),
        Rule::RepetitiveAnchor | Rule::TitleRepetition => regenerate(rule, 7, EachNode),
    }
}

/// Maps diagnostics to a bounded, deterministically ordered action list.
#[derive(Debug, Clone)]
pub struct RepairPlanner {
    max_actions: usize,
    max_prereqs: usize,
    total_minutes: Option<(u32, u32)>,
}

impl RepairPlanner {
    pub fn new(max_actions: usize, max_prereqs: usize) -> Self {
        Self {
            max_actions,
            max_prereqs,
            total_minutes: None,
        }
    }

    /// Target range for the curriculum's total estimate, in hours.
    /// Without it total-hours findings get no repair.
    pub fn with_total_hours(mut self, min_hours: f64, max_hours: f64) -> Self {
        let to_minutes = |hours: f64| (hours.max(0.0) * 60.0).round() as u32;
        self.total_minutes = Some((to_minutes(min_hours), to_minutes(max_hours)));
        self
    }

    /// Candidates are deduplicated by `(kind, target)`, ordered by
    /// severity (hard fails first), rule priority, target id and kind, then
    /// capped. Merged regeneration requests carry every triggering rule.
    pub fn plan(&self, report: &QualityReport) -> Vec<RepairAction> {
        let mut deduped: BTreeMap<(&'static str, Option<String>), RepairAction> = BTreeMap::new();

        for diagnostic in &report.diagnostics {
            for action in self.candidates(diagnostic) {
                let key = (action.kind.name(), action.target.clone());
                match deduped.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert(action);
                    }
                    Entry::Occupied(mut slot) => merge(slot.get_mut(), action),
                }
            }
        }

        let mut ordered: Vec<RepairAction> = deduped.into_values().collect();
        ordered.sort_by(|a, b| {
            b.severity
                .rank()
                .cmp(&a.severity.rank())
                .then_with(|| a.priority.cmp(&b.priority))
                .then_with(|| a.target.cmp(&b.target))
                .then_with(|| a.kind.name().cmp(b.kind.name()))
        });
        ordered.truncate(self.max_actions);

        debug!(
            selected = ordered.len(),
            diagnostics = report.diagnostics.len(),
            "repair actions planned"
        );
        ordered
    }

    fn candidates(&self, diagnostic: &Diagnostic) -> Vec<RepairAction> {
        let Some((kind, priority, targets)) =
            action_for(diagnostic, self.max_prereqs, self.total_minutes)
        else {
            return Vec::new();
        };

        let target_ids: Vec<Option<String>> = match targets {
            Targets::Graph => vec![None],
            Targets::EachNode => diagnostic.node_ids.iter().cloned().map(Some).collect(),
            Targets::FirstNode => diagnostic.node_ids.first().cloned().map(Some).into_iter().collect(),
            Targets::LastNode => diagnostic.node_ids.last().cloned().map(Some).into_iter().collect(),
        };

        target_ids
            .into_iter()
            .map(|target| RepairAction {
                kind: kind.clone(),
                target,
                rule: diagnostic.rule,
                severity: diagnostic.severity,
                priority,
                reason: diagnostic.message.clone(),
            })
            .collect()
    }
}

fn merge(existing: &mut RepairAction, incoming: RepairAction) {
    if let (
        RepairKind::RegenerateNode { rules },
        RepairKind::RegenerateNode { rules: more },
    ) = (&mut existing.kind, &incoming.kind)
    {
        rules.extend(more.iter().copied());
        rules.sort();
        rules.dedup();
    }

    let stronger = incoming.severity.rank() > existing.severity.rank()
        || (incoming.severity == existing.severity && incoming.priority < existing.priority);
    if stronger {
        existing.rule = incoming.rule;
        existing.severity = incoming.severity;
        existing.priority = incoming.priority;
        existing.reason = incoming.reason;
    }
}
