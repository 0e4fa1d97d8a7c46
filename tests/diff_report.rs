mod common;

use lessondag::dag::compute_diff;
use lessondag::model::Curriculum;
use lessondag_test_utils::builders::{CurriculumBuilder, NodeBuilder};

#[test]
fn test_diff_against_empty_previous_adds_everything() {
    common::init_tracing();
    let current = common::abc_curriculum();
    let previous = Curriculum::empty(current.topic.clone());

    let diff = compute_diff(&previous, &current).unwrap();

    assert_eq!(diff.added, vec!["A", "B", "C"]);
    assert!(diff.removed.is_empty());
    assert!(diff.changed.is_empty());
    assert_eq!(diff.time_delta_minutes, 370.0);
    assert!(diff.critical_path.before.is_empty());
    assert_eq!(diff.critical_path.after, vec!["A", "B", "C"]);
    assert!(diff.critical_path.changed);
}

#[test]
fn test_diff_of_identical_curricula_is_empty() {
    let a = common::abc_curriculum();
    let diff = compute_diff(&a, &a).unwrap();

    assert!(diff.is_empty());
    assert_eq!(diff.time_delta_minutes, 0.0);
    assert!(!diff.critical_path.changed);
}

#[test]
fn test_diff_reports_only_changed_fields_and_keeps_fractions() {
    let previous = common::abc_curriculum();
    let current = CurriculumBuilder::new("Learn graph algorithms")
        .node(NodeBuilder::new("A", "Graph basics").minutes(120.25))
        .node(NodeBuilder::new("B", "Graph traversal").after("A").minutes(150.0))
        .node(NodeBuilder::new("E", "Graph coloring").after("B").minutes(45.5))
        .build();

    let diff = compute_diff(&previous, &current).unwrap();

    assert_eq!(diff.added, vec!["E"]);
    assert_eq!(diff.removed, vec!["C"]);
    assert_eq!(diff.changed.len(), 1);
    assert_eq!(diff.changed[0].id, "A");
    let fields: Vec<&str> = diff.changed[0].fields.iter().map(|f| f.field.as_str()).collect();
    assert_eq!(fields, vec!["estimate_minutes"]);

    // 120.25 + 150 + 45.5 - 370
    assert_eq!(diff.time_delta_minutes, -54.25);
    assert_eq!(diff.critical_path.after, vec!["A", "B", "E"]);
}

#[test]
fn test_diff_fails_fast_on_cyclic_side() {
    let previous = common::abc_curriculum();
    let current = CurriculumBuilder::new("t")
        .node(NodeBuilder::new("A", "One").after("B"))
        .node(NodeBuilder::new("B", "Two").after("A"))
        .build();

    assert!(compute_diff(&previous, &current).is_err());
}
