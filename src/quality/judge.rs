// src/quality/judge.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{Curriculum, TopicSpec};
use crate::quality::content::{
    score_effort_coherence, score_mastery_actionability, score_redundancy,
    score_resource_relevance,
};
use crate::quality::diagnostic::{Diagnostic, Dimension, QualityReport};
use crate::quality::learner::score_learner_coherence;
use crate::quality::rules::{score_atomicity, score_progression, score_structural};

/// Deterministic rule-based scorer.
///
/// Stateless: identical inputs always yield an identical report, including
/// diagnostic order.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityJudge;

impl QualityJudge {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, curriculum: &Curriculum, spec: &TopicSpec) -> QualityReport {
        let mut dimensions = BTreeMap::new();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();

        for dim in Dimension::ALL {
            let (score, mut found) = match dim {
                Dimension::StructuralValidity => score_structural(curriculum, spec),
                Dimension::Atomicity => score_atomicity(curriculum),
                Dimension::PedagogicalProgression => score_progression(curriculum),
                Dimension::ResourceRelevance => score_resource_relevance(curriculum, spec),
                Dimension::MasteryActionability => score_mastery_actionability(curriculum),
                Dimension::EffortCoherence => score_effort_coherence(curriculum, spec),
                Dimension::Redundancy => score_redundancy(curriculum),
                Dimension::LearnerPathCoherence => score_learner_coherence(curriculum, spec),
            };
            debug!(dimension = ?dim, score, findings = found.len(), "dimension scored");
            dimensions.insert(dim, score);
            diagnostics.append(&mut found);
        }

        diagnostics.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.rule.as_str().cmp(b.rule.as_str()))
                .then_with(|| a.node_ids.cmp(&b.node_ids))
        });

        let weighted: f64 = dimensions
            .iter()
            .map(|(dim, score)| dim.weight() * score)
            .sum();
        let composite_score = (weighted * 100.0).round() / 100.0;
        let hard_fail_count = diagnostics.iter().filter(|d| d.is_hard_fail()).count();

        QualityReport {
            composite_score,
            dimensions,
            diagnostics,
            hard_fail_count,
        }
    }
}
