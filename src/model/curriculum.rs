// src/model/curriculum.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Schema version written into every curriculum document.
pub const CURRICULUM_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    CURRICULUM_SCHEMA_VERSION
}

fn default_estimate_confidence() -> f64 {
    0.5
}

/// A learning resource attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    /// URL or local path.
    #[serde(alias = "url")]
    pub locator: String,
    /// e.g. `doc`, `paper`, `video`, `book`, `spec`.
    pub kind: String,
    /// e.g. `definition`, `example`, `reference`.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Task plus observable pass criteria proving a node was learned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryCheck {
    pub task: String,
    pub pass_criteria: String,
}

/// Atomic learning unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumNode {
    pub id: String,
    pub title: String,
    pub capability: String,
    /// Ids of nodes that must be learned first.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub core_ideas: Vec<String>,
    #[serde(default)]
    pub pitfalls: Vec<String>,
    pub mastery_check: MasteryCheck,
    pub estimate_minutes: f64,
    #[serde(default = "default_estimate_confidence")]
    pub estimate_confidence: f64,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Open,
    Resolved,
    Deferred,
}

/// Unresolved question tied to one or more nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenQuestion {
    pub question: String,
    pub related_nodes: Vec<String>,
    pub status: QuestionStatus,
}

/// The curriculum DAG: nodes plus topic label.
///
/// Node order carries no meaning; identity and comparisons go through
/// node ids. Structural invariants (unique ids, resolvable prerequisites,
/// acyclicity) are checked by [`crate::dag::graph::validate`], not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub topic: String,
    pub nodes: Vec<CurriculumNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub open_questions: Vec<OpenQuestion>,
}

impl Curriculum {
    pub fn new(topic: impl Into<String>, nodes: Vec<CurriculumNode>) -> Self {
        Self {
            schema_version: CURRICULUM_SCHEMA_VERSION,
            topic: topic.into(),
            nodes,
            open_questions: Vec::new(),
        }
    }

    /// Curriculum with no nodes; stands in for a missing previous version.
    pub fn empty(topic: impl Into<String>) -> Self {
        Self::new(topic, Vec::new())
    }

    pub fn node(&self, id: &str) -> Option<&CurriculumNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut CurriculumNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Nodes keyed by id. Later duplicates shadow earlier ones.
    pub fn index(&self) -> BTreeMap<&str, &CurriculumNode> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    pub fn total_minutes(&self) -> f64 {
        self.nodes.iter().map(|n| n.estimate_minutes).sum()
    }

    /// Content hash independent of node order.
    ///
    /// blake3 over the canonical JSON of the topic and the id-sorted nodes.
    pub fn content_hash(&self) -> String {
        let mut sorted: Vec<&CurriculumNode> = self.nodes.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        let mut hasher = blake3::Hasher::new();
        hasher.update(self.topic.as_bytes());
        for node in sorted {
            // Serializing plain data structs into a Vec cannot fail.
            let bytes = serde_json::to_vec(node).unwrap_or_default();
            hasher.update(&bytes);
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Compact summary handed to the proposal collaborator.
    pub fn context(&self) -> CurriculumContext {
        let mut nodes: Vec<ContextNode> = self
            .nodes
            .iter()
            .map(|n| ContextNode {
                id: n.id.clone(),
                title: n.title.clone(),
                prerequisites: n.prerequisites.clone(),
                estimate_minutes: n.estimate_minutes,
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        CurriculumContext {
            topic: self.topic.clone(),
            nodes,
        }
    }
}

/// Compact view of a curriculum: ids, titles, and edges only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurriculumContext {
    pub topic: String,
    pub nodes: Vec<ContextNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextNode {
    pub id: String,
    pub title: String,
    pub prerequisites: Vec<String>,
    pub estimate_minutes: f64,
}

impl CurriculumContext {
    pub fn node(&self, id: &str) -> Option<&ContextNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
