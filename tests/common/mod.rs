#![allow(dead_code)]

use lessondag::config::{ConfigFile, PlannerSection, PolicySection};
use lessondag::model::{Curriculum, TopicSpec};
use lessondag_test_utils::builders::{CurriculumBuilder, NodeBuilder, TopicSpecBuilder};

pub use lessondag_test_utils::init_tracing;

/// Three-node spec: 300 minutes per week.
pub fn scenario_spec() -> TopicSpec {
    TopicSpecBuilder::new("Learn graph algorithms")
        .scope("graph basics")
        .scope("graph traversal")
        .scope("graph search")
        .hours_per_week(5.0)
        .build()
}

/// A(120) -> B(150) -> C(100).
pub fn abc_curriculum() -> Curriculum {
    CurriculumBuilder::new("Learn graph algorithms")
        .node(NodeBuilder::new("A", "Graph basics").minutes(120.0))
        .node(NodeBuilder::new("B", "Graph traversal").after("A").minutes(150.0))
        .node(NodeBuilder::new("C", "Graph search").after("B").minutes(100.0))
        .build()
}

pub fn two_week_bounds() -> PlannerSection {
    PlannerSection {
        min_weeks: 2,
        max_weeks: 2,
    }
}

pub fn policy() -> PolicySection {
    PolicySection::default()
}

pub fn config() -> ConfigFile {
    ConfigFile::default()
}

/// Spec whose template draft has six nodes.
pub fn template_spec() -> TopicSpec {
    TopicSpecBuilder::new("Learn distributed consensus")
        .scope("replicated logs")
        .scope("leader election")
        .scope("log replication")
        .scope("membership changes")
        .scope("snapshot compaction")
        .scope("linearizable reads")
        .total_hours(8.0, 12.0)
        .focus_terms(&["raft", "consensus"])
        .build()
}

/// `scenario_spec` asking for 6-10 nodes and 40-50 hours, which the
/// three-node `abc_curriculum` misses on both counts.
pub fn scoped_spec() -> TopicSpec {
    let mut spec = scenario_spec();
    spec.constraints.node_count_min = Some(6);
    spec.constraints.node_count_max = Some(10);
    spec.constraints.total_hours_min = 40.0;
    spec.constraints.total_hours_max = 50.0;
    spec
}
