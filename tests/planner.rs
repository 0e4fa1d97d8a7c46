mod common;

use lessondag::config::PlannerSection;
use lessondag::dag::order::path_minutes;
use lessondag::dag::plan::derive_week_count;
use lessondag::dag::{
    build_plan, compute_diff, critical_path, topological_order, StructuralViolation,
};
use lessondag_test_utils::builders::{CurriculumBuilder, NodeBuilder};

#[test]
fn test_three_node_scenario_packs_two_weeks() {
    common::init_tracing();
    let spec = common::scenario_spec();
    let curriculum = common::abc_curriculum();

    let plan = build_plan(&spec, &curriculum, &common::two_week_bounds()).unwrap();

    assert_eq!(plan.duration_weeks, 2);
    assert_eq!(plan.weeks[0].nodes, vec!["A", "B"]);
    assert_eq!(plan.weeks[0].allocated_minutes, 270.0);
    assert_eq!(plan.weeks[1].nodes, vec!["C"]);
    assert_eq!(plan.weeks[1].allocated_minutes, 100.0);
    assert_eq!(plan.topological_order, vec!["A", "B", "C"]);
    assert_eq!(plan.total_estimated_minutes, 370.0);
    assert_eq!(plan.curriculum_hash, curriculum.content_hash());

    assert!(plan.weeks[0].review.is_none());
    let review = plan.weeks[1].review.as_ref().unwrap();
    assert_eq!(review.covers_weeks, vec![1]);
    let reviewed: Vec<&str> = review.mastery_checks.iter().map(|d| d.node_id.as_str()).collect();
    assert_eq!(reviewed, vec!["A", "B"]);
}

#[test]
fn test_critical_path_follows_longest_chain() {
    let curriculum = common::abc_curriculum();
    let path = critical_path(&curriculum).unwrap();
    assert_eq!(path, vec!["A", "B", "C"]);
    assert_eq!(path_minutes(&curriculum, &path), 370.0);
}

#[test]
fn test_critical_path_ties_go_to_smaller_id() {
    // Two equal branches into D.
    let curriculum = CurriculumBuilder::new("t")
        .node(NodeBuilder::new("B", "Branch two").minutes(30.0))
        .node(NodeBuilder::new("A", "Branch one").minutes(30.0))
        .node(NodeBuilder::new("D", "Join").after("B").after("A").minutes(10.0))
        .build();

    assert_eq!(critical_path(&curriculum).unwrap(), vec!["A", "D"]);
}

#[test]
fn test_topological_order_breaks_ties_by_id() {
    let curriculum = CurriculumBuilder::new("t")
        .node(NodeBuilder::new("c", "Gamma"))
        .node(NodeBuilder::new("a", "Alpha"))
        .node(NodeBuilder::new("d", "Delta").after("c"))
        .node(NodeBuilder::new("b", "Beta"))
        .build();

    assert_eq!(topological_order(&curriculum).unwrap(), vec!["a", "b", "c", "d"]);
}

#[test]
fn test_planner_fails_fast_on_cycle() {
    let curriculum = CurriculumBuilder::new("t")
        .node(NodeBuilder::new("A", "One").after("B"))
        .node(NodeBuilder::new("B", "Two").after("A"))
        .build();

    assert!(matches!(
        topological_order(&curriculum),
        Err(StructuralViolation::Cycle { .. })
    ));
    assert!(critical_path(&curriculum).is_err());
    let spec = common::scenario_spec();
    assert!(build_plan(&spec, &curriculum, &PlannerSection::default()).is_err());
}

#[test]
fn test_planner_fails_fast_on_dangling_prerequisite() {
    let curriculum = CurriculumBuilder::new("t")
        .node(NodeBuilder::new("D", "Graph depth").after("Z"))
        .build();
    let expected = StructuralViolation::DanglingPrerequisite {
        node: "D".to_string(),
        missing: "Z".to_string(),
    };

    assert_eq!(topological_order(&curriculum), Err(expected.clone()));
    assert_eq!(critical_path(&curriculum), Err(expected.clone()));
    let spec = common::scenario_spec();
    assert_eq!(
        build_plan(&spec, &curriculum, &PlannerSection::default()).unwrap_err(),
        expected
    );
    assert_eq!(
        compute_diff(&common::abc_curriculum(), &curriculum).unwrap_err(),
        expected
    );
}

#[test]
fn test_planner_never_drops_a_duplicated_node() {
    let curriculum = CurriculumBuilder::new("t")
        .node(NodeBuilder::new("A", "First").minutes(100.0))
        .node(NodeBuilder::new("A", "Second").minutes(100.0))
        .build();
    let duplicate = StructuralViolation::DuplicateId { id: "A".to_string() };

    assert_eq!(topological_order(&curriculum), Err(duplicate.clone()));
    let spec = common::scenario_spec();
    assert_eq!(
        build_plan(&spec, &curriculum, &PlannerSection::default()).unwrap_err(),
        duplicate
    );
    assert_eq!(
        compute_diff(&curriculum, &common::abc_curriculum()).unwrap_err(),
        duplicate
    );
}

#[test]
fn test_last_allowed_week_relaxes_capacity() {
    let spec = common::scenario_spec();
    let curriculum = CurriculumBuilder::new("t")
        .node(NodeBuilder::new("A", "One").minutes(250.0))
        .node(NodeBuilder::new("B", "Two").after("A").minutes(250.0))
        .node(NodeBuilder::new("C", "Three").after("B").minutes(250.0))
        .build();

    let plan = build_plan(&spec, &curriculum, &common::two_week_bounds()).unwrap();

    assert_eq!(plan.weeks.len(), 2);
    assert_eq!(plan.weeks[1].nodes, vec!["B", "C"]);
    assert_eq!(plan.weeks[1].allocated_minutes, 500.0);
    let scheduled: usize = plan.weeks.iter().map(|w| w.nodes.len()).sum();
    assert_eq!(scheduled, 3);
}

#[test]
fn test_week_count_is_clamped_to_bounds() {
    let bounds = PlannerSection {
        min_weeks: 2,
        max_weeks: 4,
    };
    assert_eq!(derive_week_count(100.0, 300.0, &bounds), 2);
    assert_eq!(derive_week_count(1000.0, 300.0, &bounds), 4);
    assert_eq!(derive_week_count(900.0, 300.0, &bounds), 3);
    assert_eq!(derive_week_count(0.0, 300.0, &bounds), 2);
    assert_eq!(derive_week_count(500.0, 0.0, &bounds), 4);
}
