mod common;

use lessondag::config::PolicySection;
use lessondag::engine::{
    Decision, LoopState, OptimizationLoop, OptimizationTrace, StopReason, TRACE_SCHEMA_VERSION,
};
use lessondag::proposal::{FailureKind, TemplateProposer};
use lessondag::quality::Rule;
use lessondag_test_utils::builders::{CurriculumBuilder, NodeBuilder};
use lessondag_test_utils::scripted_proposer::ScriptedProposer;

fn transitions(trace: &OptimizationTrace) -> Vec<(LoopState, LoopState)> {
    trace.records.iter().map(|r| (r.from, r.to)).collect()
}

fn assert_well_formed(trace: &OptimizationTrace) {
    assert_eq!(trace.schema_version, TRACE_SCHEMA_VERSION);
    for (i, record) in trace.records.iter().enumerate() {
        assert_eq!(record.sequence, i);
    }
    let first = trace.records.first().unwrap();
    assert_eq!(first.from, LoopState::Drafting);
    let last = trace.records.last().unwrap();
    assert_eq!(last.to, LoopState::Terminated);
    assert_eq!(last.decision, Decision::Stop);
    assert_eq!(last.reason, trace.stop_reason.as_str());
}

fn unreachable_target() -> PolicySection {
    PolicySection {
        target_score: 101.0,
        ..PolicySection::default()
    }
}

fn missing_resources_on_b() -> lessondag::model::Curriculum {
    CurriculumBuilder::new("Learn graph algorithms")
        .node(NodeBuilder::new("A", "Graph basics").minutes(120.0))
        .node(NodeBuilder::new("B", "Graph traversal").after("A").minutes(150.0).no_resources())
        .node(NodeBuilder::new("C", "Graph search").after("B").minutes(100.0))
        .build()
}

#[test]
fn test_structurally_invalid_draft_never_reaches_scoring() {
    common::init_tracing();
    let broken = CurriculumBuilder::new("t")
        .node(NodeBuilder::new("A", "Graph basics"))
        .node(NodeBuilder::new("D", "Graph depth").after("Z"))
        .build();
    let mut proposer = ScriptedProposer::new().with_draft(broken);
    let calls = proposer.calls();

    let result = OptimizationLoop::new(common::policy()).run(
        &common::scenario_spec(),
        None,
        &mut proposer,
    );

    assert!(result.curriculum.is_none());
    assert!(!result.accepted);
    assert_eq!(result.stop_reason, StopReason::RetryBudgetExhausted);
    assert_eq!(result.trace.best_score, None);
    assert_eq!(
        transitions(&result.trace),
        vec![
            (LoopState::Drafting, LoopState::Drafting),
            (LoopState::Drafting, LoopState::Drafting),
            (LoopState::Drafting, LoopState::Plateau),
            (LoopState::Plateau, LoopState::Terminated),
        ]
    );
    assert_eq!(result.trace.records[0].decision, Decision::Retry);
    let diagnostic = &result.trace.records[0].diagnostics[0];
    assert_eq!(diagnostic.rule, Rule::MissingPrerequisite);
    assert_eq!(diagnostic.node_ids, vec!["D", "Z"]);
    assert!(
        result
            .trace
            .records
            .iter()
            .all(|r| r.to != LoopState::Scoring)
    );
    assert_eq!(calls.lock().unwrap().len(), 3);
    assert_well_formed(&result.trace);
}

#[test]
fn test_propose_failure_is_retried_within_budget() {
    let mut proposer = ScriptedProposer::new()
        .with_draft_failure(FailureKind::Timeout, "no answer")
        .with_draft(common::abc_curriculum());

    let result = OptimizationLoop::new(common::policy()).run(
        &common::scenario_spec(),
        None,
        &mut proposer,
    );

    assert!(result.accepted);
    assert_eq!(result.stop_reason, StopReason::Accepted);
    assert_eq!(result.curriculum, Some(common::abc_curriculum()));
    assert_eq!(result.trace.best_score, Some(100.0));
    assert_eq!(
        transitions(&result.trace),
        vec![
            (LoopState::Drafting, LoopState::Drafting),
            (LoopState::Drafting, LoopState::Scoring),
            (LoopState::Scoring, LoopState::Accepted),
            (LoopState::Accepted, LoopState::Terminated),
        ]
    );
    assert_eq!(result.trace.records[0].reason, "propose failed: timeout: no answer");
    assert_eq!(result.trace.records[2].decision, Decision::Accept);
    assert_eq!(result.trace.records[2].iteration, 1);
    assert_well_formed(&result.trace);
}

#[test]
fn test_hard_fail_blocks_acceptance_even_with_low_target() {
    let lenient = PolicySection {
        target_score: 0.0,
        min_pedagogy_score: 0.0,
        retry_budget: 0,
        ..PolicySection::default()
    };
    let mut proposer = ScriptedProposer::new().with_draft(missing_resources_on_b());

    let result = OptimizationLoop::new(lenient).run(&common::scenario_spec(), None, &mut proposer);

    assert!(!result.accepted);
    assert_eq!(result.stop_reason, StopReason::RetryBudgetExhausted);
    assert!(result.trace.records.iter().all(|r| r.to != LoopState::Accepted));
    assert_eq!(
        transitions(&result.trace),
        vec![
            (LoopState::Drafting, LoopState::Scoring),
            (LoopState::Scoring, LoopState::Repairing),
            (LoopState::Repairing, LoopState::Plateau),
            (LoopState::Plateau, LoopState::Terminated),
        ]
    );
    let repairing = &result.trace.records[1];
    assert_eq!(repairing.planned.len(), 1);
    assert_eq!(repairing.planned[0].target.as_deref(), Some("B"));
    assert!(result.trace.records[2].actions[0].outcome.is_failed());

    // Best graph so far is still handed back.
    assert_eq!(result.curriculum, Some(missing_resources_on_b()));
    assert!((result.trace.best_score.unwrap() - 97.84).abs() < 1e-9);
    assert_well_formed(&result.trace);
}

#[test]
fn test_repair_then_accept() {
    let mut proposer = ScriptedProposer::new()
        .with_draft(missing_resources_on_b())
        .with_node(
            NodeBuilder::new("B", "Graph traversal")
                .after("A")
                .minutes(150.0)
                .build(),
        );
    let calls = proposer.calls();

    let result = OptimizationLoop::new(common::policy()).run(
        &common::scenario_spec(),
        None,
        &mut proposer,
    );

    assert!(result.accepted);
    assert_eq!(result.curriculum, Some(common::abc_curriculum()));
    assert_eq!(
        transitions(&result.trace),
        vec![
            (LoopState::Drafting, LoopState::Scoring),
            (LoopState::Scoring, LoopState::Repairing),
            (LoopState::Repairing, LoopState::Scoring),
            (LoopState::Scoring, LoopState::Accepted),
            (LoopState::Accepted, LoopState::Terminated),
        ]
    );
    assert_eq!(result.trace.records[3].iteration, 2);
    assert_eq!(*calls.lock().unwrap(), vec!["propose", "regenerate:B"]);
    assert_well_formed(&result.trace);
}

#[test]
fn test_plateau_after_consecutive_zero_action_rounds() {
    let mut proposer = ScriptedProposer::new().with_draft(common::abc_curriculum());

    let result = OptimizationLoop::new(unreachable_target()).run(
        &common::scenario_spec(),
        None,
        &mut proposer,
    );

    assert!(!result.accepted);
    assert_eq!(result.stop_reason, StopReason::NoActions);
    assert_eq!(
        transitions(&result.trace),
        vec![
            (LoopState::Drafting, LoopState::Scoring),
            (LoopState::Scoring, LoopState::Scoring),
            (LoopState::Scoring, LoopState::Plateau),
            (LoopState::Plateau, LoopState::Terminated),
        ]
    );
    assert_eq!(result.curriculum, Some(common::abc_curriculum()));
    assert_eq!(result.trace.best_score, Some(100.0));
    assert_well_formed(&result.trace);
}

#[test]
fn test_max_iterations_stops_the_loop() {
    let policy = PolicySection {
        max_iterations: 1,
        ..unreachable_target()
    };
    let mut proposer = ScriptedProposer::new().with_draft(common::abc_curriculum());

    let result = OptimizationLoop::new(policy).run(&common::scenario_spec(), None, &mut proposer);

    assert_eq!(result.stop_reason, StopReason::MaxIterations);
    assert_eq!(
        transitions(&result.trace),
        vec![
            (LoopState::Drafting, LoopState::Scoring),
            (LoopState::Scoring, LoopState::Plateau),
            (LoopState::Plateau, LoopState::Terminated),
        ]
    );
    assert!(result.trace.records.iter().all(|r| r.policy.max_iterations == 1));
    assert_well_formed(&result.trace);
}

#[test]
fn test_template_runs_are_deterministic() {
    let spec = common::template_spec();
    let run = || {
        let mut proposer = TemplateProposer::new();
        OptimizationLoop::new(common::policy()).run(&spec, None, &mut proposer)
    };

    let first = run();
    let second = run();

    assert_eq!(first.trace, second.trace);
    assert_eq!(first.curriculum, second.curriculum);
    assert_eq!(
        serde_json::to_vec(&first.trace).unwrap(),
        serde_json::to_vec(&second.trace).unwrap()
    );
    assert!(first.curriculum.is_some());
    assert_well_formed(&first.trace);
}

#[test]
fn test_empty_draft_plateaus_without_acceptance() {
    let mut proposer = ScriptedProposer::new()
        .with_draft(CurriculumBuilder::new("Learn graph algorithms").build());

    let result = OptimizationLoop::new(common::policy()).run(
        &common::scenario_spec(),
        None,
        &mut proposer,
    );

    assert!(!result.accepted);
    assert_eq!(result.stop_reason, StopReason::NoActions);
    assert_eq!(
        transitions(&result.trace),
        vec![
            (LoopState::Drafting, LoopState::Scoring),
            (LoopState::Scoring, LoopState::Scoring),
            (LoopState::Scoring, LoopState::Plateau),
            (LoopState::Plateau, LoopState::Terminated),
        ]
    );
    assert_eq!(result.trace.records[1].diagnostics[0].rule, Rule::EmptyCurriculum);
    assert_eq!(result.trace.best_score, Some(70.0));
    assert_well_formed(&result.trace);
}

#[test]
fn test_out_of_range_hours_are_rescaled_but_node_count_blocks_acceptance() {
    let mut proposer = ScriptedProposer::new().with_draft(common::abc_curriculum());

    let result = OptimizationLoop::new(common::policy()).run(
        &common::scoped_spec(),
        None,
        &mut proposer,
    );

    assert!(!result.accepted);
    assert_eq!(result.stop_reason, StopReason::NoActions);
    assert_eq!(
        transitions(&result.trace),
        vec![
            (LoopState::Drafting, LoopState::Scoring),
            (LoopState::Scoring, LoopState::Repairing),
            (LoopState::Repairing, LoopState::Scoring),
            (LoopState::Scoring, LoopState::Scoring),
            (LoopState::Scoring, LoopState::Plateau),
            (LoopState::Plateau, LoopState::Terminated),
        ]
    );
    let planned: Vec<&str> = result.trace.records[1]
        .planned
        .iter()
        .map(|a| a.kind.name())
        .collect();
    assert_eq!(planned, vec!["scale_estimates"]);

    let best = result.curriculum.unwrap();
    let minutes: Vec<f64> = best.nodes.iter().map(|n| n.estimate_minutes).collect();
    assert_eq!(minutes, vec![875.0, 1095.0, 730.0]);
    let remaining: Vec<Rule> = result.trace.records[3]
        .diagnostics
        .iter()
        .map(|d| d.rule)
        .collect();
    assert_eq!(remaining, vec![Rule::NodeCount]);
    assert!((result.trace.best_score.unwrap() - 95.6).abs() < 1e-9);
    assert_well_formed(&result.trace);
}
