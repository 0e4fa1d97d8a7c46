// src/quality/learner.rs

//! Learner-path coherence: does each node follow from what came before it?

use crate::model::{tokens, Curriculum, TopicSpec};
use crate::quality::diagnostic::{Diagnostic, Findings, Rule};

const ADVANCED_MARKERS: [&str; 2] = ["integrate", "validate"];
const WORKLOAD_JUMP_FACTOR: f64 = 2.2;

pub(crate) fn score_learner_coherence(
    curriculum: &Curriculum,
    spec: &TopicSpec,
) -> (f64, Vec<Diagnostic>) {
    let mut findings = Findings::new();
    let index = curriculum.index();
    let max_prereqs = spec.max_prerequisites();

    for node in &curriculum.nodes {
        let title_tokens = tokens(&node.title);
        let capability_tokens = tokens(&node.capability);

        let looks_advanced = ADVANCED_MARKERS
            .iter()
            .any(|m| capability_tokens.contains(*m))
            || title_tokens.contains("integration");
        if node.prerequisites.is_empty() && looks_advanced {
            findings.flag(
                Rule::HiddenPrerequisite,
                vec![node.id.clone()],
                "node reads as advanced but has no prerequisites",
                25.0,
            );
        }

        if node.prerequisites.len() > max_prereqs {
            findings.flag(
                Rule::PrerequisiteOverload,
                vec![node.id.clone()],
                format!(
                    "{} prerequisites exceed the cap of {max_prereqs}",
                    node.prerequisites.len()
                ),
                8.0,
            );
        }

        let parents: Vec<_> = node
            .prerequisites
            .iter()
            .filter_map(|p| index.get(p.as_str()))
            .collect();

        if !parents.is_empty() {
            let bridged = parents.iter().any(|parent| {
                let mut parent_tokens = tokens(&parent.title);
                parent_tokens.extend(tokens(&parent.capability));
                !title_tokens.is_disjoint(&parent_tokens)
            });
            if !bridged {
                findings.flag(
                    Rule::ConceptJump,
                    vec![node.id.clone()],
                    "no lexical bridge to any prerequisite suggests a concept jump",
                    8.0,
                );
            }

            let peak = parents
                .iter()
                .map(|p| p.estimate_minutes)
                .fold(0.0_f64, f64::max);
            if peak > 0.0 && node.estimate_minutes > peak * WORKLOAD_JUMP_FACTOR {
                findings.flag(
                    Rule::WorkloadJump,
                    vec![node.id.clone()],
                    format!(
                        "{} min follows a prerequisite peak of {peak} min",
                        node.estimate_minutes
                    ),
                    8.0,
                );
            }
        }
    }

    findings.finish()
}
