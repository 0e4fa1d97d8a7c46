// src/engine/optimizer.rs

//! Bounded propose → judge → repair loop.
//!
//! The loop is synchronous and single-threaded. It never returns an error:
//! proposal failures are absorbed into the retry budget and structurally
//! invalid drafts are rejected without being merged. What comes out is the
//! best graph seen (if any) plus the full trace.

use tracing::{debug, info, warn};

use crate::config::PolicySection;
use crate::dag::graph::validate;
use crate::engine::budget::RetryBudget;
use crate::engine::trace::{
    Decision, LoopState, OptimizationTrace, StopReason, TraceRecorder, Transition,
};
use crate::model::{Curriculum, CurriculumContext, TopicSpec};
use crate::proposal::Proposer;
use crate::quality::rules::score_structural;
use crate::quality::{QualityJudge, QualityReport};
use crate::repair::{RepairExecutor, RepairPlanner};

#[derive(Debug, Clone)]
pub struct OptimizeResult {
    /// Best scored graph; `None` when no draft ever made it to scoring.
    pub curriculum: Option<Curriculum>,
    pub accepted: bool,
    pub stop_reason: StopReason,
    pub trace: OptimizationTrace,
}

#[derive(Debug, Clone)]
pub struct OptimizationLoop {
    policy: PolicySection,
    judge: QualityJudge,
    executor: RepairExecutor,
}

/// Best graph so far: fewest hard fails, then highest composite.
struct Best {
    curriculum: Curriculum,
    hard_fails: usize,
    score: f64,
}

impl Best {
    fn offer(best: &mut Option<Best>, curriculum: &Curriculum, report: &QualityReport) {
        let better = match best {
            None => true,
            Some(b) => {
                report.hard_fail_count < b.hard_fails
                    || (report.hard_fail_count == b.hard_fails && report.composite_score > b.score)
            }
        };
        if better {
            *best = Some(Best {
                curriculum: curriculum.clone(),
                hard_fails: report.hard_fail_count,
                score: report.composite_score,
            });
        }
    }
}

impl OptimizationLoop {
    pub fn new(policy: PolicySection) -> Self {
        Self {
            policy,
            judge: QualityJudge::new(),
            executor: RepairExecutor::new(),
        }
    }

    pub fn policy(&self) -> &PolicySection {
        &self.policy
    }

    /// Run the loop to a terminal state.
    ///
    /// `previous` is the last accepted curriculum, summarized for the
    /// proposer; pass `None` on a first run.
    pub fn run(
        &self,
        spec: &TopicSpec,
        previous: Option<&Curriculum>,
        proposer: &mut dyn Proposer,
    ) -> OptimizeResult {
        let mut trace = TraceRecorder::new(self.policy.clone());
        let mut budget = RetryBudget::new(self.policy.retry_budget);
        let context = previous.map(Curriculum::context).unwrap_or_default();

        info!(
            max_iterations = self.policy.max_iterations,
            target = self.policy.target_score,
            "optimization loop started"
        );

        let Some(mut current) = self.draft(spec, &context, proposer, &mut trace, &mut budget)
        else {
            return finish(trace, None, false, StopReason::RetryBudgetExhausted, 0);
        };

        let planner = RepairPlanner::new(
            self.policy.max_actions_per_iteration,
            spec.max_prerequisites(),
        )
        .with_total_hours(spec.constraints.total_hours_min, spec.constraints.total_hours_max);
        let mut best: Option<Best> = None;
        let mut zero_action_streak = 0u32;
        let mut iteration = 0u32;

        loop {
            iteration += 1;
            let report = self.judge.score(&current, spec);
            Best::offer(&mut best, &current, &report);
            info!(
                iteration,
                score = report.composite_score,
                hard_fails = report.hard_fail_count,
                "curriculum scored"
            );

            if report.accepts(&self.policy) {
                trace.record(
                    Transition::new(
                        iteration,
                        LoopState::Scoring,
                        LoopState::Accepted,
                        Decision::Accept,
                        format!(
                            "no hard fails, composite {:.2} >= {:.2}",
                            report.composite_score, self.policy.target_score
                        ),
                    )
                    .with_diagnostics(report.diagnostics.clone())
                    .with_score(report.composite_score),
                );
                let outcome = Some((current, report.composite_score));
                return finish(trace, outcome, true, StopReason::Accepted, iteration);
            }

            if iteration >= self.policy.max_iterations {
                trace.record(
                    Transition::new(
                        iteration,
                        LoopState::Scoring,
                        LoopState::Plateau,
                        Decision::Stop,
                        format!("max_iterations ({}) reached", self.policy.max_iterations),
                    )
                    .with_diagnostics(report.diagnostics.clone())
                    .with_score(report.composite_score),
                );
                return finish_best(trace, best, StopReason::MaxIterations, iteration);
            }

            let actions = planner.plan(&report);
            if actions.is_empty() {
                zero_action_streak += 1;
                let reached = zero_action_streak >= self.policy.plateau_window;
                let (to, decision, reason) = if reached {
                    (
                        LoopState::Plateau,
                        Decision::Stop,
                        format!("no repair actions for {zero_action_streak} consecutive iterations"),
                    )
                } else {
                    (
                        LoopState::Scoring,
                        Decision::Continue,
                        format!("no repair actions selected ({zero_action_streak} in a row)"),
                    )
                };
                trace.record(
                    Transition::new(iteration, LoopState::Scoring, to, decision, reason)
                        .with_diagnostics(report.diagnostics.clone())
                        .with_score(report.composite_score),
                );
                if reached {
                    return finish_best(trace, best, StopReason::NoActions, iteration);
                }
                continue;
            }
            zero_action_streak = 0;

            trace.record(
                Transition::new(
                    iteration,
                    LoopState::Scoring,
                    LoopState::Repairing,
                    Decision::Continue,
                    format!(
                        "{} hard fails, composite {:.2} below acceptance; {} actions selected",
                        report.hard_fail_count,
                        report.composite_score,
                        actions.len()
                    ),
                )
                .with_diagnostics(report.diagnostics.clone())
                .with_planned(actions.clone())
                .with_score(report.composite_score),
            );

            let applied = self
                .executor
                .apply(&mut current, &actions, &report, proposer, &mut budget);
            let failed = applied.iter().filter(|a| a.outcome.is_failed()).count();
            debug!(applied = applied.len(), failed, "repair pass finished");

            if budget.is_exhausted() {
                warn!(iteration, failures = budget.used(), "retry budget exhausted during repair");
                trace.record(
                    Transition::new(
                        iteration,
                        LoopState::Repairing,
                        LoopState::Plateau,
                        Decision::Stop,
                        StopReason::RetryBudgetExhausted.as_str(),
                    )
                    .with_actions(applied),
                );
                return finish_best(trace, best, StopReason::RetryBudgetExhausted, iteration);
            }

            trace.record(
                Transition::new(
                    iteration,
                    LoopState::Repairing,
                    LoopState::Scoring,
                    Decision::Continue,
                    format!("{} actions applied, {failed} failed", applied.len()),
                )
                .with_actions(applied),
            );
        }
    }

    /// Obtain a structurally valid draft, retrying within the budget.
    fn draft(
        &self,
        spec: &TopicSpec,
        context: &CurriculumContext,
        proposer: &mut dyn Proposer,
        trace: &mut TraceRecorder,
        budget: &mut RetryBudget,
    ) -> Option<Curriculum> {
        loop {
            let (reason, diagnostics) = match proposer.propose(spec, context) {
                Ok(draft) => match validate(&draft).first() {
                    None => {
                        trace.record(Transition::new(
                            0,
                            LoopState::Drafting,
                            LoopState::Scoring,
                            Decision::Continue,
                            format!("draft received with {} nodes", draft.nodes.len()),
                        ));
                        return Some(draft);
                    }
                    Some(violation) => (
                        format!("draft rejected: {violation}"),
                        score_structural(&draft, spec).1,
                    ),
                },
                Err(failure) => (format!("propose failed: {failure}"), Vec::new()),
            };

            warn!(reason = %reason, "draft unusable");
            if budget.try_consume() {
                trace.record(
                    Transition::new(0, LoopState::Drafting, LoopState::Drafting, Decision::Retry, reason)
                        .with_diagnostics(diagnostics),
                );
                continue;
            }

            trace.record(
                Transition::new(
                    0,
                    LoopState::Drafting,
                    LoopState::Plateau,
                    Decision::Stop,
                    format!("{}: {reason}", StopReason::RetryBudgetExhausted),
                )
                .with_diagnostics(diagnostics),
            );
            return None;
        }
    }
}

fn finish_best(
    trace: TraceRecorder,
    best: Option<Best>,
    stop_reason: StopReason,
    iteration: u32,
) -> OptimizeResult {
    let outcome = best.map(|b| (b.curriculum, b.score));
    finish(trace, outcome, false, stop_reason, iteration)
}

fn finish(
    mut trace: TraceRecorder,
    outcome: Option<(Curriculum, f64)>,
    accepted: bool,
    stop_reason: StopReason,
    iteration: u32,
) -> OptimizeResult {
    let from = if accepted {
        LoopState::Accepted
    } else {
        LoopState::Plateau
    };
    trace.record(Transition::new(
        iteration,
        from,
        LoopState::Terminated,
        Decision::Stop,
        stop_reason.as_str(),
    ));

    let (curriculum, best_score) = match outcome {
        Some((c, score)) => (Some(c), Some(score)),
        None => (None, None),
    };
    info!(%stop_reason, accepted, "optimization loop finished");

    OptimizeResult {
        curriculum,
        accepted,
        stop_reason,
        trace: trace.finish(stop_reason, accepted, best_score),
    }
}
