// src/repair/action.rs

use serde::{Deserialize, Serialize};

use crate::quality::Rule;
use crate::types::Severity;

/// Typed mutation the executor knows how to apply.
///
/// Everything except [`RepairKind::RegenerateNode`] is a deterministic
/// in-place edit of the curriculum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepairKind {
    /// Remove prerequisite ids that resolve to no node.
    DropDanglingPrereqs,
    /// Remove a node's reference to itself.
    DropSelfDependency,
    /// Remove the edge `from -> to` (i.e. `to` no longer lists `from`).
    BreakCycle { from: String, to: String },
    /// Give later duplicates of an id fresh `<id>-<n>` ids.
    RenameDuplicate,
    /// Add the node just before the target in topological order as a
    /// prerequisite.
    AttachPredecessor,
    /// Keep only the first `keep` prerequisites (ascending id).
    TrimPrereqs { keep: usize },
    /// Chain all roots in ascending id order.
    ChainRoots,
    /// Cap an estimate relative to the median and its prerequisites.
    RetimeNode,
    /// Re-spread estimates with a depth ramp.
    RebalanceEstimates,
    /// Scale every estimate so the total lands inside
    /// `[min_minutes, max_minutes]`, aiming at the middle of the range.
    ScaleEstimates { min_minutes: u32, max_minutes: u32 },
    /// Ask the proposal collaborator for a fresh copy of one node.
    RegenerateNode { rules: Vec<Rule> },
}

impl RepairKind {
    /// Stable name, used for deduplication and ordering.
    pub fn name(&self) -> &'static str {
        match self {
            RepairKind::DropDanglingPrereqs => "drop_dangling_prereqs",
            RepairKind::DropSelfDependency => "drop_self_dependency",
            RepairKind::BreakCycle { .. } => "break_cycle",
            RepairKind::RenameDuplicate => "rename_duplicate",
            RepairKind::AttachPredecessor => "attach_predecessor",
            RepairKind::TrimPrereqs { .. } => "trim_prereqs",
            RepairKind::ChainRoots => "chain_roots",
            RepairKind::RetimeNode => "retime_node",
            RepairKind::RebalanceEstimates => "rebalance_estimates",
            RepairKind::ScaleEstimates { .. } => "scale_estimates",
            RepairKind::RegenerateNode { .. } => "regenerate_node",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairAction {
    #[serde(flatten)]
    pub kind: RepairKind,
    /// Target node; `None` for graph-wide actions.
    pub target: Option<String>,
    /// Rule that triggered the action.
    pub rule: Rule,
    pub severity: Severity,
    /// Lower runs first within a severity.
    pub priority: u8,
    pub reason: String,
}

/// What happened when an action was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Applied { attempts: u32 },
    Noop,
    Failed { reason: String, attempts: u32 },
}

impl ActionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ActionOutcome::Failed { .. })
    }
}

/// An action together with its outcome, as recorded in the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedAction {
    pub action: RepairAction,
    pub outcome: ActionOutcome,
}
