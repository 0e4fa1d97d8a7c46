// src/quality/rules.rs

//! Graph-shaped rule families: structure, atomicity, progression.

use crate::dag::graph::{validate, CurriculumGraph, StructuralViolation};
use crate::model::{Curriculum, TopicSpec};
use crate::quality::diagnostic::{Diagnostic, Findings, Rule};

pub(crate) fn score_structural(
    curriculum: &Curriculum,
    spec: &TopicSpec,
) -> (f64, Vec<Diagnostic>) {
    let mut findings = Findings::new();

    let count = curriculum.nodes.len();
    if count == 0 {
        findings.flag(Rule::EmptyCurriculum, Vec::new(), "curriculum has no nodes", 100.0);
        return findings.finish();
    }

    let c = &spec.constraints;
    if c.node_count_min.is_some() || c.node_count_max.is_some() {
        let min = c.node_count_min.map_or(count, |m| m as usize);
        let max = c.node_count_max.map_or(count, |m| m as usize);
        if count < min || count > max {
            findings.flag(
                Rule::NodeCount,
                Vec::new(),
                format!("node count {count} outside [{min}, {max}]"),
                20.0,
            );
        }
    }

    for violation in validate(curriculum) {
        let (rule, penalty) = match &violation {
            StructuralViolation::DuplicateId { .. } => (Rule::DuplicateNodeIds, 60.0),
            StructuralViolation::DanglingPrerequisite { .. } => (Rule::MissingPrerequisite, 15.0),
            StructuralViolation::SelfDependency { .. } => (Rule::SelfDependency, 15.0),
            StructuralViolation::Cycle { .. } => (Rule::Cycle, 50.0),
        };
        findings.flag(rule, violation.node_ids(), violation.to_string(), penalty);
    }

    findings.finish()
}

fn is_compound(capability: &str) -> bool {
    let lowered = capability.to_lowercase();
    lowered.contains(" and ") || lowered.contains(';')
}

pub(crate) fn score_atomicity(curriculum: &Curriculum) -> (f64, Vec<Diagnostic>) {
    let mut findings = Findings::new();
    let mut offenders = Vec::new();

    for node in &curriculum.nodes {
        if is_compound(&node.capability) {
            offenders.push(node.id.clone());
            findings.flag(
                Rule::CompoundCapability,
                vec![node.id.clone()],
                "capability appears compound; should target one primary skill",
                12.0,
            );
        }
    }

    let n = curriculum.nodes.len();
    if n > 0 && offenders.len() > (n / 4).max(1) {
        let count = offenders.len();
        findings.flag(
            Rule::AtomicityThreshold,
            offenders,
            format!("{count} of {n} nodes are not atomic"),
            0.0,
        );
    }

    findings.finish()
}

pub(crate) fn score_progression(curriculum: &Curriculum) -> (f64, Vec<Diagnostic>) {
    let mut findings = Findings::new();
    let n = curriculum.nodes.len();

    let roots = curriculum
        .nodes
        .iter()
        .filter(|node| node.prerequisites.is_empty())
        .count();
    if n >= 4 && roots == n {
        findings.flag(
            Rule::AllRoots,
            Vec::new(),
            "all nodes are roots; progression is weak",
            45.0,
        );
    }

    let depth = CurriculumGraph::new(curriculum).max_depth();
    if n >= 6 && depth < 2 {
        findings.flag(
            Rule::DepthTooShallow,
            Vec::new(),
            format!("graph depth {depth} is too shallow for {n} nodes"),
            40.0,
        );
    }

    findings.finish()
}

