mod common;

use std::io::Write;
use std::time::Duration;

use lessondag::dag::graph::validate;
use lessondag::model::CurriculumContext;
use lessondag::proposal::{CommandProposer, FailureKind, Proposer, TemplateProposer};
use lessondag::quality::QualityJudge;
use tempfile::NamedTempFile;

#[test]
fn test_template_draft_is_deterministic_and_valid() {
    common::init_tracing();
    let spec = common::template_spec();

    let first = TemplateProposer::draft(&spec);
    let second = TemplateProposer::new()
        .propose(&spec, &CurriculumContext::default())
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.nodes.len(), 6);
    let ids: Vec<&str> = first.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["N1", "N2", "N3", "N4", "N5", "N6"]);
    assert!(validate(&first).is_empty());
    assert!(first.nodes.iter().skip(1).all(|n| !n.prerequisites.is_empty()));

    let report = QualityJudge::new().score(&first, &spec);
    assert_eq!(report.hard_fail_count, 0, "{:?}", report.diagnostics);
}

#[test]
fn test_template_regeneration_keeps_current_wiring() {
    let spec = common::template_spec();
    let mut curriculum = TemplateProposer::draft(&spec);
    curriculum.node_mut("N3").unwrap().prerequisites = vec!["N1".to_string()];

    let mut proposer = TemplateProposer::with_spec(spec);
    let node = proposer
        .regenerate_node("N3", &[], &curriculum.context())
        .unwrap();

    assert_eq!(node.id, "N3");
    assert_eq!(node.prerequisites, vec!["N1"]);

    let missing = proposer
        .regenerate_node("N42", &[], &curriculum.context())
        .unwrap_err();
    assert_eq!(missing.kind, FailureKind::Missing);
}

#[test]
fn test_template_regeneration_needs_a_spec() {
    let err = TemplateProposer::new()
        .regenerate_node("N1", &[], &CurriculumContext::default())
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Missing);
}

#[cfg(unix)]
mod command {
    use super::*;

    fn proposer(cmd: &str, timeout_secs: u64) -> CommandProposer {
        CommandProposer::new(cmd, Duration::from_secs(timeout_secs)).unwrap()
    }

    fn fixture(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_command_output_is_parsed_as_curriculum() {
        let doc = fixture(&serde_json::to_vec(&common::abc_curriculum()).unwrap());
        let mut p = proposer(&format!("cat '{}'", doc.path().display()), 10);

        let curriculum = p
            .propose(&common::scenario_spec(), &CurriculumContext::default())
            .unwrap();

        assert_eq!(curriculum, common::abc_curriculum());
    }

    #[test]
    fn test_request_is_written_to_stdin() {
        // Echoing the request back is not a curriculum.
        let mut p = proposer("cat", 10);
        let err = p
            .propose(&common::scenario_spec(), &CurriculumContext::default())
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Malformed);
    }

    #[test]
    fn test_failures_are_typed() {
        let spec = common::scenario_spec();
        let ctx = CurriculumContext::default();

        let rejected = proposer("exit 3", 10).propose(&spec, &ctx).unwrap_err();
        assert_eq!(rejected.kind, FailureKind::Rejected);
        assert_eq!(rejected.message, "exit code 3");

        let empty = proposer("true", 10).propose(&spec, &ctx).unwrap_err();
        assert_eq!(empty.kind, FailureKind::Missing);

        let garbage = proposer("echo not-json", 10).propose(&spec, &ctx).unwrap_err();
        assert_eq!(garbage.kind, FailureKind::Malformed);

        let slow = proposer("sleep 5", 1).propose(&spec, &ctx).unwrap_err();
        assert_eq!(slow.kind, FailureKind::Timeout);
    }

    #[test]
    fn test_regenerated_node_must_match_requested_id() {
        let node = common::abc_curriculum().nodes[0].clone();
        let doc = fixture(&serde_json::to_vec(&node).unwrap());
        let mut p = proposer(&format!("cat '{}'", doc.path().display()), 10);
        let ctx = common::abc_curriculum().context();

        assert_eq!(p.regenerate_node("A", &[], &ctx).unwrap(), node);
        let err = p.regenerate_node("B", &[], &ctx).unwrap_err();
        assert_eq!(err.kind, FailureKind::Malformed);
    }

    #[test]
    fn test_unsupported_schema_version_is_malformed() {
        let mut doc = serde_json::to_value(common::abc_curriculum()).unwrap();
        doc["schema_version"] = serde_json::json!(9);
        let file = fixture(&serde_json::to_vec(&doc).unwrap());
        let mut p = proposer(&format!("cat '{}'", file.path().display()), 10);

        let err = p
            .propose(&common::scenario_spec(), &CurriculumContext::default())
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Malformed);
        assert!(err.message.contains("schema_version 9"));
    }
}
