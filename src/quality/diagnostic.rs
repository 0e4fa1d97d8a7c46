// src/quality/diagnostic.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PolicySection;
use crate::types::Severity;

/// Scored dimension of curriculum quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    StructuralValidity,
    Atomicity,
    PedagogicalProgression,
    ResourceRelevance,
    MasteryActionability,
    EffortCoherence,
    Redundancy,
    LearnerPathCoherence,
}

impl Dimension {
    pub const ALL: [Dimension; 8] = [
        Dimension::StructuralValidity,
        Dimension::Atomicity,
        Dimension::PedagogicalProgression,
        Dimension::ResourceRelevance,
        Dimension::MasteryActionability,
        Dimension::EffortCoherence,
        Dimension::Redundancy,
        Dimension::LearnerPathCoherence,
    ];

    /// Weight in the composite score. Weights sum to 1.0.
    pub fn weight(self) -> f64 {
        match self {
            Dimension::StructuralValidity => 0.22,
            Dimension::Atomicity => 0.14,
            Dimension::PedagogicalProgression => 0.14,
            Dimension::ResourceRelevance => 0.12,
            Dimension::MasteryActionability => 0.14,
            Dimension::EffortCoherence => 0.08,
            Dimension::Redundancy => 0.08,
            Dimension::LearnerPathCoherence => 0.08,
        }
    }
}

/// Every rule the judge can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rule {
    #[serde(rename = "structure.duplicate_node_ids")]
    DuplicateNodeIds,
    #[serde(rename = "structure.missing_prerequisite")]
    MissingPrerequisite,
    #[serde(rename = "structure.self_dependency")]
    SelfDependency,
    #[serde(rename = "structure.cycle")]
    Cycle,
    #[serde(rename = "structure.empty_curriculum")]
    EmptyCurriculum,
    #[serde(rename = "structure.node_count")]
    NodeCount,
    #[serde(rename = "atomicity.compound_capability")]
    CompoundCapability,
    #[serde(rename = "atomicity.threshold")]
    AtomicityThreshold,
    #[serde(rename = "progression.all_roots")]
    AllRoots,
    #[serde(rename = "progression.depth_too_shallow")]
    DepthTooShallow,
    #[serde(rename = "resource.missing")]
    ResourceMissing,
    #[serde(rename = "resource.weak_relevance")]
    WeakRelevance,
    #[serde(rename = "resource.repetitive_anchor")]
    RepetitiveAnchor,
    #[serde(rename = "mastery.non_actionable_task")]
    NonActionableTask,
    #[serde(rename = "mastery.non_measurable_criteria")]
    NonMeasurableCriteria,
    #[serde(rename = "effort.invalid_estimate")]
    InvalidEstimate,
    #[serde(rename = "effort.flat_distribution")]
    FlatDistribution,
    #[serde(rename = "effort.outlier")]
    EffortOutlier,
    #[serde(rename = "effort.total_hours")]
    TotalHours,
    #[serde(rename = "redundancy.title_repetition")]
    TitleRepetition,
    #[serde(rename = "redundancy.template_similarity")]
    TemplateSimilarity,
    #[serde(rename = "learner.hidden_prerequisite")]
    HiddenPrerequisite,
    #[serde(rename = "learner.prerequisite_overload")]
    PrerequisiteOverload,
    #[serde(rename = "learner.concept_jump")]
    ConceptJump,
    #[serde(rename = "learner.workload_jump")]
    WorkloadJump,
}

impl Rule {
    pub fn as_str(self) -> &'static str {
        match self {
            Rule::DuplicateNodeIds => "structure.duplicate_node_ids",
            Rule::MissingPrerequisite => "structure.missing_prerequisite",
            Rule::SelfDependency => "structure.self_dependency",
            Rule::Cycle => "structure.cycle",
            Rule::EmptyCurriculum => "structure.empty_curriculum",
            Rule::NodeCount => "structure.node_count",
            Rule::CompoundCapability => "atomicity.compound_capability",
            Rule::AtomicityThreshold => "atomicity.threshold",
            Rule::AllRoots => "progression.all_roots",
            Rule::DepthTooShallow => "progression.depth_too_shallow",
            Rule::ResourceMissing => "resource.missing",
            Rule::WeakRelevance => "resource.weak_relevance",
            Rule::RepetitiveAnchor => "resource.repetitive_anchor",
            Rule::NonActionableTask => "mastery.non_actionable_task",
            Rule::NonMeasurableCriteria => "mastery.non_measurable_criteria",
            Rule::InvalidEstimate => "effort.invalid_estimate",
            Rule::FlatDistribution => "effort.flat_distribution",
            Rule::EffortOutlier => "effort.outlier",
            Rule::TotalHours => "effort.total_hours",
            Rule::TitleRepetition => "redundancy.title_repetition",
            Rule::TemplateSimilarity => "redundancy.template_similarity",
            Rule::HiddenPrerequisite => "learner.hidden_prerequisite",
            Rule::PrerequisiteOverload => "learner.prerequisite_overload",
            Rule::ConceptJump => "learner.concept_jump",
            Rule::WorkloadJump => "learner.workload_jump",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Rule::DuplicateNodeIds
            | Rule::MissingPrerequisite
            | Rule::SelfDependency
            | Rule::Cycle
            | Rule::EmptyCurriculum
            | Rule::NodeCount
            | Rule::AtomicityThreshold
            | Rule::ResourceMissing
            | Rule::NonActionableTask
            | Rule::NonMeasurableCriteria
            | Rule::InvalidEstimate
            | Rule::TotalHours
            | Rule::HiddenPrerequisite => Severity::HardFail,
            _ => Severity::Advisory,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One deterministic finding against a curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule: Rule,
    pub severity: Severity,
    /// Offending nodes; empty for graph-wide findings.
    pub node_ids: Vec<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(rule: Rule, node_ids: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: rule.severity(),
            node_ids,
            message: message.into(),
        }
    }

    pub fn is_hard_fail(&self) -> bool {
        self.severity == Severity::HardFail
    }

    pub fn mentions(&self, node_id: &str) -> bool {
        self.node_ids.iter().any(|n| n == node_id)
    }
}

/// Judge output for one curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub composite_score: f64,
    pub dimensions: BTreeMap<Dimension, f64>,
    pub diagnostics: Vec<Diagnostic>,
    pub hard_fail_count: usize,
}

impl QualityReport {
    pub fn dimension(&self, dim: Dimension) -> f64 {
        self.dimensions.get(&dim).copied().unwrap_or(0.0)
    }

    /// Acceptance gate: no hard fails, composite at or above target and
    /// learner-path coherence at or above the pedagogy floor.
    pub fn accepts(&self, policy: &PolicySection) -> bool {
        self.hard_fail_count == 0
            && self.composite_score >= policy.target_score
            && self.dimension(Dimension::LearnerPathCoherence) >= policy.min_pedagogy_score
    }

    /// Diagnostics that mention `node_id`.
    pub fn for_node(&self, node_id: &str) -> Vec<Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.mentions(node_id))
            .cloned()
            .collect()
    }
}

/// Accumulates a dimension score and its diagnostics.
#[derive(Debug)]
pub(crate) struct Findings {
    score: f64,
    diagnostics: Vec<Diagnostic>,
}

impl Findings {
    pub(crate) fn new() -> Self {
        Self {
            score: 100.0,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn flag(
        &mut self,
        rule: Rule,
        node_ids: Vec<String>,
        message: impl Into<String>,
        penalty: f64,
    ) {
        self.score -= penalty;
        self.diagnostics.push(Diagnostic::new(rule, node_ids, message));
    }

    pub(crate) fn penalize(&mut self, penalty: f64) {
        self.score -= penalty;
    }

    /// Score clamped to 0..=100 plus the collected diagnostics.
    pub(crate) fn finish(self) -> (f64, Vec<Diagnostic>) {
        (self.score.clamp(0.0, 100.0), self.diagnostics)
    }
}
