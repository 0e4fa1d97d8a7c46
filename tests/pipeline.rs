mod common;

use lessondag::dag::{DiffReport, Plan};
use lessondag::errors::CompilerError;
use lessondag::pipeline::Pipeline;
use lessondag::proposal::TemplateProposer;
use lessondag::stage::Stage;
use lessondag::store::{self, ArtifactKind, FsRunStore, MemoryRunStore, RunMeta, RunStore};
use lessondag_test_utils::builders::{CurriculumBuilder, NodeBuilder, TopicSpecBuilder};
use lessondag_test_utils::scripted_proposer::ScriptedProposer;

fn scenario_json() -> Vec<u8> {
    serde_json::to_vec_pretty(&common::scenario_spec()).unwrap()
}

fn template_json() -> Vec<u8> {
    serde_json::to_vec_pretty(&common::template_spec()).unwrap()
}

fn halted(err: CompilerError) -> (Stage, CompilerError) {
    match err {
        CompilerError::Halted { stage, source } => (stage, *source),
        other => panic!("expected halted error, got {other:?}"),
    }
}

#[test]
fn test_full_run_in_memory() {
    common::init_tracing();
    let store = MemoryRunStore::new("graphs");
    let config = common::config();
    let pipeline = Pipeline::new(&store, &config);
    let mut proposer = ScriptedProposer::new().with_draft(common::abc_curriculum());

    let stage = pipeline.run(Some(scenario_json().as_slice()), &mut proposer).unwrap();

    assert_eq!(stage, Stage::Iterated);

    let plan: Plan = store::load_required(&store, ArtifactKind::Plan).unwrap();
    assert_eq!(plan.weeks[0].nodes, vec!["A", "B"]);
    assert_eq!(plan.weeks[1].nodes, vec!["C"]);

    let diff: DiffReport = store::load_required(&store, ArtifactKind::DiffReport).unwrap();
    assert_eq!(diff.added, vec!["A", "B", "C"]);
    assert_eq!(diff.time_delta_minutes, 370.0);

    let status = pipeline.status().unwrap();
    assert_eq!(status.stage, Stage::Iterated);
    assert!(status.stale.is_empty());
    // No earlier curriculum on a first run.
    assert!(!status.artifacts["previous_curriculum"]);
    assert!(status.artifacts["optimization_trace"]);
    assert!(status.artifacts["validation_marker"]);

    let meta: RunMeta = store::load_required(&store, ArtifactKind::RunMetadata).unwrap();
    let reached: Vec<Stage> = meta.history.iter().map(|e| e.stage).collect();
    assert_eq!(
        reached,
        vec![
            Stage::SpecReady,
            Stage::Generated,
            Stage::Validated,
            Stage::Planned,
            Stage::Iterated
        ]
    );

    let kinds: Vec<String> = store.events().into_iter().map(|e| e.event_type).collect();
    for expected in ["run_initialized", "curriculum_generated", "validated", "planned", "iterated"] {
        assert!(kinds.iter().any(|k| k == expected), "missing {expected} in {kinds:?}");
    }
}

#[test]
fn test_full_run_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsRunStore::open(dir.path(), "consensus").unwrap();
    let config = common::config();
    let pipeline = Pipeline::new(&store, &config);

    let stage = pipeline
        .run(Some(template_json().as_slice()), &mut TemplateProposer::new())
        .unwrap();

    assert_eq!(stage, Stage::Iterated);
    for relative in [
        "run.json",
        "inputs/topic_spec.json",
        "outputs/curriculum/curriculum.json",
        "outputs/reviews/optimization_trace.json",
        "outputs/plan/plan.json",
        "outputs/reviews/diff_report.json",
        "logs/validation.ok",
        "logs/events.jsonl",
    ] {
        assert!(store.root().join(relative).is_file(), "{relative} missing");
    }

    let events = std::fs::read_to_string(store.root().join("logs/events.jsonl")).unwrap();
    assert!(events.lines().count() >= 5);
    for line in events.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value.get("event_type").is_some());
    }

    // A second store over the same directory sees the same run.
    let reopened = FsRunStore::open(dir.path(), "consensus").unwrap();
    let status = Pipeline::new(&reopened, &config).status().unwrap();
    assert_eq!(status.stage, Stage::Iterated);
}

#[test]
fn test_identical_inputs_produce_identical_artifacts() {
    let config = common::config();
    let run = || {
        let store = MemoryRunStore::new("det");
        Pipeline::new(&store, &config)
            .run(Some(template_json().as_slice()), &mut TemplateProposer::new())
            .unwrap();
        store
    };

    let first = run();
    let second = run();

    for kind in [
        ArtifactKind::Curriculum,
        ArtifactKind::OptimizationTrace,
        ArtifactKind::Plan,
        ArtifactKind::DiffReport,
        ArtifactKind::ValidationMarker,
    ] {
        let a = first.read_artifact(kind).unwrap().unwrap();
        let b = second.read_artifact(kind).unwrap().unwrap();
        assert_eq!(a, b, "{kind} differs between runs");
    }
}

#[test]
fn test_commands_out_of_order_halt_with_stage() {
    let store = MemoryRunStore::new("early");
    let config = common::config();
    let pipeline = Pipeline::new(&store, &config);
    pipeline.init(&scenario_json()).unwrap();

    let err = pipeline.validate().unwrap_err();
    assert_eq!(err.halted_stage(), Some(Stage::SpecReady));
    let (_, source) = halted(err);
    assert!(matches!(
        source,
        CompilerError::StageConflict {
            required: Stage::Generated,
            actual: Stage::SpecReady
        }
    ));

    assert!(pipeline.iterate().is_err());
    assert!(!store.exists(ArtifactKind::ValidationMarker));
}

#[test]
fn test_missing_run_is_reported() {
    let store = MemoryRunStore::new("ghost");
    let config = common::config();

    let err = Pipeline::new(&store, &config).status().unwrap_err();

    let (stage, source) = halted(err);
    assert_eq!(stage, Stage::Initialized);
    assert!(matches!(source, CompilerError::RunNotFound(ref id) if id == "ghost"));
}

#[test]
fn test_init_rejects_spec_failing_its_contract() {
    let store = MemoryRunStore::new("bad-spec");
    let config = common::config();
    let spec = TopicSpecBuilder::new("Learn graph algorithms").to_json();

    let err = Pipeline::new(&store, &config).init(&spec).unwrap_err();

    let (_, source) = halted(err);
    match source {
        CompilerError::ContractInvalid { artifact, reason } => {
            assert_eq!(artifact, "topic_spec");
            assert!(reason.contains("scope_in"), "{reason}");
        }
        other => panic!("expected contract error, got {other:?}"),
    }
    assert!(!store.exists(ArtifactKind::TopicSpec));
    assert!(!store.exists(ArtifactKind::RunMetadata));
}

#[test]
fn test_generate_without_usable_draft_keeps_the_trace() {
    let store = MemoryRunStore::new("broken");
    let config = common::config();
    let pipeline = Pipeline::new(&store, &config);
    pipeline.init(&scenario_json()).unwrap();
    let broken = CurriculumBuilder::new("t")
        .node(NodeBuilder::new("D", "Graph depth").after("Z"))
        .build();

    let err = pipeline
        .generate(&mut ScriptedProposer::new().with_draft(broken))
        .unwrap_err();

    let (stage, source) = halted(err);
    assert_eq!(stage, Stage::SpecReady);
    assert!(matches!(source, CompilerError::Regeneration(_)));
    assert!(store.exists(ArtifactKind::OptimizationTrace));
    assert!(!store.exists(ArtifactKind::Curriculum));
    assert_eq!(pipeline.status().unwrap().stage, Stage::SpecReady);
}

#[test]
fn test_validate_refuses_hard_fails_without_deleting() {
    let store = MemoryRunStore::new("hard-fail");
    let mut config = common::config();
    config.policy.retry_budget = 0;
    let pipeline = Pipeline::new(&store, &config);
    pipeline.init(&scenario_json()).unwrap();
    let draft = CurriculumBuilder::new("Learn graph algorithms")
        .node(NodeBuilder::new("A", "Graph basics"))
        .node(NodeBuilder::new("B", "Graph traversal").after("A").no_resources())
        .build();

    let summary = pipeline
        .generate(&mut ScriptedProposer::new().with_draft(draft))
        .unwrap();
    assert!(!summary.accepted);
    assert_eq!(summary.stage, Stage::Generated);

    let err = pipeline.validate().unwrap_err();
    let (stage, source) = halted(err);
    assert_eq!(stage, Stage::Generated);
    match source {
        CompilerError::ValidationFailed(message) => {
            assert!(message.contains("resource.missing"), "{message}");
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(store.exists(ArtifactKind::Curriculum));
    assert!(!store.exists(ArtifactKind::ValidationMarker));
}

#[test]
fn test_regenerating_downgrades_stage_and_keeps_previous() {
    let store = MemoryRunStore::new("again");
    let config = common::config();
    let pipeline = Pipeline::new(&store, &config);
    pipeline
        .run(Some(template_json().as_slice()), &mut TemplateProposer::new())
        .unwrap();

    let summary = pipeline.generate(&mut TemplateProposer::new()).unwrap();
    assert_eq!(summary.stage, Stage::Generated);
    assert!(store.exists(ArtifactKind::PreviousCurriculum));

    let status = pipeline.status().unwrap();
    assert!(status.stale.iter().any(|s| s.artifact == "validation_marker"));

    pipeline.validate().unwrap();
    pipeline.plan().unwrap();
    let diff = pipeline.iterate().unwrap();
    assert!(diff.is_empty());
}

#[test]
fn test_run_ids_cannot_escape_the_runs_dir() {
    let dir = tempfile::tempdir().unwrap();
    for bad in ["", "../escape", ".hidden", "a/b", "spaces here"] {
        let err = FsRunStore::open(dir.path(), bad).unwrap_err();
        assert!(matches!(err, CompilerError::Config(_)), "{bad:?} accepted");
    }
    assert!(store::validate_run_id("run-2024.10_a").is_ok());
}
