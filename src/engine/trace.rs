// src/engine/trace.rs

//! Append-only audit trail of one optimization run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PolicySection;
use crate::quality::Diagnostic;
use crate::repair::{AppliedAction, RepairAction};

pub const TRACE_SCHEMA_VERSION: u32 = 1;

/// Loop states. `Accepted`, `Plateau` and `Terminated` are terminal-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Drafting,
    Scoring,
    Repairing,
    Accepted,
    Plateau,
    Terminated,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopState::Drafting => "drafting",
            LoopState::Scoring => "scoring",
            LoopState::Repairing => "repairing",
            LoopState::Accepted => "accepted",
            LoopState::Plateau => "plateau",
            LoopState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Continue,
    Retry,
    Accept,
    Stop,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Accepted,
    MaxIterations,
    NoActions,
    RetryBudgetExhausted,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Accepted => "accepted",
            StopReason::MaxIterations => "max_iterations",
            StopReason::NoActions => "no_actions",
            StopReason::RetryBudgetExhausted => "retry_budget_exhausted",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One state transition, written before the state changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Position in the trace, from 0.
    pub sequence: usize,
    /// Scoring round the transition belongs to, from 1. Zero while drafting.
    pub iteration: u32,
    pub from: LoopState,
    pub to: LoopState,
    pub policy: PolicySection,
    pub diagnostics: Vec<Diagnostic>,
    /// Actions chosen when entering `repairing`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<RepairAction>,
    /// Actions applied when leaving `repairing`, with outcomes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<AppliedAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub decision: Decision,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationTrace {
    pub schema_version: u32,
    pub stop_reason: StopReason,
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_score: Option<f64>,
    pub records: Vec<IterationRecord>,
}

/// Collects records while the loop runs. Only ever appended to; turned
/// into an [`OptimizationTrace`] exactly once.
#[derive(Debug)]
pub(crate) struct TraceRecorder {
    policy: PolicySection,
    records: Vec<IterationRecord>,
}

/// Payload of a single transition.
#[derive(Debug)]
pub(crate) struct Transition {
    pub iteration: u32,
    pub from: LoopState,
    pub to: LoopState,
    pub diagnostics: Vec<Diagnostic>,
    pub planned: Vec<RepairAction>,
    pub actions: Vec<AppliedAction>,
    pub score: Option<f64>,
    pub decision: Decision,
    pub reason: String,
}

impl Transition {
    pub(crate) fn new(
        iteration: u32,
        from: LoopState,
        to: LoopState,
        decision: Decision,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            iteration,
            from,
            to,
            diagnostics: Vec::new(),
            planned: Vec::new(),
            actions: Vec::new(),
            score: None,
            decision,
            reason: reason.into(),
        }
    }

    pub(crate) fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub(crate) fn with_planned(mut self, planned: Vec<RepairAction>) -> Self {
        self.planned = planned;
        self
    }

    pub(crate) fn with_actions(mut self, actions: Vec<AppliedAction>) -> Self {
        self.actions = actions;
        self
    }

    pub(crate) fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

impl TraceRecorder {
    pub(crate) fn new(policy: PolicySection) -> Self {
        Self {
            policy,
            records: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, t: Transition) {
        self.records.push(IterationRecord {
            sequence: self.records.len(),
            iteration: t.iteration,
            from: t.from,
            to: t.to,
            policy: self.policy.clone(),
            diagnostics: t.diagnostics,
            planned: t.planned,
            actions: t.actions,
            score: t.score,
            decision: t.decision,
            reason: t.reason,
        });
    }

    pub(crate) fn finish(
        self,
        stop_reason: StopReason,
        accepted: bool,
        best_score: Option<f64>,
    ) -> OptimizationTrace {
        OptimizationTrace {
            schema_version: TRACE_SCHEMA_VERSION,
            stop_reason,
            accepted,
            best_score,
            records: self.records,
        }
    }
}
