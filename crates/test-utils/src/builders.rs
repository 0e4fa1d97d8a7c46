#![allow(dead_code)]

use lessondag::model::{
    Constraints, ContextPack, Curriculum, CurriculumNode, MasteryCheck, Resource, TopicSpec,
    TOPIC_SPEC_SCHEMA_VERSION,
};
use lessondag::types::{Depth, DomainMode, EvidenceMode};

/// Builder for `CurriculumNode`.
///
/// Defaults pass every content rule of the judge: an actionable task, a
/// measurable criterion and one resource whose title repeats the node
/// title. Give nodes distinct multi-word titles to avoid the redundancy
/// rules.
pub struct NodeBuilder {
    node: CurriculumNode,
}

impl NodeBuilder {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            node: CurriculumNode {
                id: id.to_string(),
                title: title.to_string(),
                capability: format!("Explain {} using concrete examples", title.to_lowercase()),
                prerequisites: Vec::new(),
                core_ideas: vec![format!("Core vocabulary of {}", title.to_lowercase())],
                pitfalls: vec![format!("Skipping the edge cases of {}", title.to_lowercase())],
                mastery_check: MasteryCheck {
                    task: format!("Write a short exercise that applies {}", title.to_lowercase()),
                    pass_criteria: "Solution must include at least three correct cases"
                        .to_string(),
                },
                estimate_minutes: 60.0,
                estimate_confidence: 0.7,
                resources: vec![Resource {
                    title: format!("{title} reference"),
                    locator: format!("notes/{}.md", id.to_lowercase()),
                    kind: "doc".to_string(),
                    role: "definition".to_string(),
                    citation: None,
                    confidence: None,
                }],
            },
        }
    }

    pub fn after(mut self, prereq: &str) -> Self {
        self.node.prerequisites.push(prereq.to_string());
        self
    }

    pub fn minutes(mut self, minutes: f64) -> Self {
        self.node.estimate_minutes = minutes;
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.node.estimate_confidence = confidence;
        self
    }

    pub fn capability(mut self, capability: &str) -> Self {
        self.node.capability = capability.to_string();
        self
    }

    pub fn task(mut self, task: &str) -> Self {
        self.node.mastery_check.task = task.to_string();
        self
    }

    pub fn criteria(mut self, criteria: &str) -> Self {
        self.node.mastery_check.pass_criteria = criteria.to_string();
        self
    }

    pub fn no_resources(mut self) -> Self {
        self.node.resources.clear();
        self
    }

    pub fn build(self) -> CurriculumNode {
        self.node
    }
}

/// Builder for `Curriculum`.
pub struct CurriculumBuilder {
    curriculum: Curriculum,
}

impl CurriculumBuilder {
    pub fn new(topic: &str) -> Self {
        Self {
            curriculum: Curriculum::empty(topic),
        }
    }

    pub fn node(mut self, node: NodeBuilder) -> Self {
        self.curriculum.nodes.push(node.build());
        self
    }

    pub fn build(self) -> Curriculum {
        self.curriculum
    }
}

/// Builder for `TopicSpec`. The default spec is contract-valid and its
/// 1-40 hour range admits the small curricula tests score against it.
pub struct TopicSpecBuilder {
    spec: TopicSpec,
}

impl TopicSpecBuilder {
    pub fn new(goal: &str) -> Self {
        Self {
            spec: TopicSpec {
                schema_version: TOPIC_SPEC_SCHEMA_VERSION,
                goal: goal.to_string(),
                audience: "Working engineers".to_string(),
                prerequisites: Vec::new(),
                scope_in: Vec::new(),
                scope_out: Vec::new(),
                misconceptions: Vec::new(),
                constraints: Constraints {
                    hours_per_week: 5.0,
                    total_hours_min: 1.0,
                    total_hours_max: 40.0,
                    depth: Depth::Practical,
                    node_count_min: None,
                    node_count_max: None,
                    max_prerequisites_per_node: None,
                },
                domain_mode: DomainMode::Mature,
                evidence_mode: EvidenceMode::Minimal,
                context_pack: None,
            },
        }
    }

    pub fn scope(mut self, item: &str) -> Self {
        self.spec.scope_in.push(item.to_string());
        self
    }

    pub fn hours_per_week(mut self, hours: f64) -> Self {
        self.spec.constraints.hours_per_week = hours;
        self
    }

    pub fn total_hours(mut self, min: f64, max: f64) -> Self {
        self.spec.constraints.total_hours_min = min;
        self.spec.constraints.total_hours_max = max;
        self
    }

    pub fn max_prerequisites(mut self, max: u32) -> Self {
        self.spec.constraints.max_prerequisites_per_node = Some(max);
        self
    }

    pub fn focus_terms(mut self, terms: &[&str]) -> Self {
        let pack = self.spec.context_pack.get_or_insert_with(ContextPack::default);
        pack.focus_terms.extend(terms.iter().map(|t| t.to_string()));
        self
    }

    pub fn build(self) -> TopicSpec {
        self.spec
    }

    /// The spec as a JSON document, ready for `Pipeline::init`.
    pub fn to_json(self) -> Vec<u8> {
        serde_json::to_vec_pretty(&self.spec).expect("topic spec serializes")
    }
}
