// src/model/mod.rs

//! Curriculum and topic-spec data types.
//!
//! Pure data; structural checks over the prerequisite graph live in
//! [`crate::dag::graph`].

pub mod curriculum;
pub mod topic_spec;

pub use curriculum::{
    ContextNode, Curriculum, CurriculumContext, CurriculumNode, MasteryCheck, OpenQuestion,
    QuestionStatus, Resource, CURRICULUM_SCHEMA_VERSION,
};
pub use topic_spec::{Constraints, ContextPack, TopicSpec, TOPIC_SPEC_SCHEMA_VERSION};

/// Word tokens of four or more alphanumeric characters, lowercased.
///
/// Shared by the judge and the repair executor for lexical overlap checks.
pub fn tokens(text: &str) -> std::collections::BTreeSet<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 4)
        .map(str::to_string)
        .collect()
}
