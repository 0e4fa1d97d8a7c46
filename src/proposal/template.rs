// src/proposal/template.rs

//! Deterministic offline proposer.
//!
//! One node per `scope_in` item, ids `N1..Nn`, chained by stage. Output
//! depends only on the topic spec, so the same spec always drafts a
//! byte-identical curriculum.

use tracing::debug;

use crate::model::{
    Curriculum, CurriculumContext, CurriculumNode, MasteryCheck, Resource, TopicSpec,
};
use crate::proposal::{FailureKind, Proposer, RegenerationFailure};
use crate::quality::Diagnostic;
use crate::types::EvidenceMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeStage {
    Foundation,
    Application,
    Integration,
    Validation,
}

impl NodeStage {
    fn for_index(index: usize, total: usize) -> Self {
        if total <= 3 {
            return [
                NodeStage::Foundation,
                NodeStage::Application,
                NodeStage::Validation,
            ][index.min(2)];
        }
        if index <= (total / 4).max(1) {
            NodeStage::Foundation
        } else if index <= (total * 2 / 4).max(2) {
            NodeStage::Application
        } else if index <= (total * 3 / 4).max(3) {
            NodeStage::Integration
        } else {
            NodeStage::Validation
        }
    }

    /// Relative share of the time budget.
    fn weight(self) -> f64 {
        match self {
            NodeStage::Foundation => 0.8,
            NodeStage::Application => 1.0,
            NodeStage::Integration => 1.2,
            NodeStage::Validation => 1.1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateProposer {
    spec: Option<TopicSpec>,
}

impl TemplateProposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Proposer already primed with a spec, so `regenerate_node` works
    /// without a prior `propose`.
    pub fn with_spec(spec: TopicSpec) -> Self {
        Self { spec: Some(spec) }
    }

    /// Full draft for `spec`.
    pub fn draft(spec: &TopicSpec) -> Curriculum {
        let titles = titles(spec);
        let weights: Vec<f64> = (0..titles.len())
            .map(|i| NodeStage::for_index(i, titles.len()).weight())
            .collect();
        let nodes = (0..titles.len())
            .map(|i| build_node(spec, &titles, &weights, i))
            .collect();
        Curriculum::new(spec.goal.trim(), nodes)
    }
}

impl Proposer for TemplateProposer {
    fn propose(
        &mut self,
        spec: &TopicSpec,
        _context: &CurriculumContext,
    ) -> Result<Curriculum, RegenerationFailure> {
        self.spec = Some(spec.clone());
        let curriculum = Self::draft(spec);
        debug!(nodes = curriculum.nodes.len(), "template draft built");
        Ok(curriculum)
    }

    fn regenerate_node(
        &mut self,
        node_id: &str,
        diagnostics: &[Diagnostic],
        context: &CurriculumContext,
    ) -> Result<CurriculumNode, RegenerationFailure> {
        let Some(spec) = self.spec.as_ref() else {
            return Err(RegenerationFailure::new(
                FailureKind::Missing,
                "regenerate_node called before propose",
            ));
        };

        let titles = titles(spec);
        let index = node_index(node_id)
            .filter(|i| *i < titles.len())
            .ok_or_else(|| {
                RegenerationFailure::new(
                    FailureKind::Missing,
                    format!("node '{node_id}' is not part of the template"),
                )
            })?;

        let weights: Vec<f64> = (0..titles.len())
            .map(|i| NodeStage::for_index(i, titles.len()).weight())
            .collect();
        let mut node = build_node(spec, &titles, &weights, index);

        // Keep the current wiring so the merged graph stays consistent.
        if let Some(current) = context.node(node_id) {
            node.prerequisites = current
                .prerequisites
                .iter()
                .filter(|p| context.node(p).is_some())
                .cloned()
                .collect();
        }

        debug!(node = node_id, diagnostics = diagnostics.len(), "template node rebuilt");
        Ok(node)
    }
}

fn titles(spec: &TopicSpec) -> Vec<String> {
    spec.scope_in
        .iter()
        .map(|s| capitalize(s.trim()))
        .filter(|s| !s.is_empty())
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn slug(s: &str) -> String {
    let words: Vec<String> = s
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    words.join("-")
}

fn node_id(index: usize) -> String {
    format!("N{}", index + 1)
}

fn node_index(id: &str) -> Option<usize> {
    id.strip_prefix('N')?
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
}

fn prerequisites(index: usize, total: usize, max_prereqs: usize) -> Vec<String> {
    if index == 0 {
        return Vec::new();
    }
    let stage = NodeStage::for_index(index, total);
    let mut out = vec![node_id(index - 1)];
    if max_prereqs >= 2
        && index >= 3
        && matches!(stage, NodeStage::Integration | NodeStage::Validation)
    {
        out.push(node_id(index - 2));
    }
    if max_prereqs >= 3 && index >= 5 && stage == NodeStage::Validation {
        out.push(node_id(index - 4));
    }
    out.dedup();
    out.truncate(max_prereqs);
    out
}

fn capability(title: &str, next: Option<&str>, stage: NodeStage) -> String {
    let lower = title.to_lowercase();
    let base = match stage {
        NodeStage::Foundation => format!("Define {lower} with precise concepts"),
        NodeStage::Application => format!("Implement {lower} in a runnable workflow"),
        NodeStage::Integration => format!("Integrate {lower} with prior components"),
        NodeStage::Validation => {
            format!("Validate {lower} end-to-end against explicit quality criteria")
        }
    };
    match next {
        Some(next) => format!("{base}, as groundwork for {}.", next.to_lowercase()),
        None => format!("{base}."),
    }
}

fn core_ideas(title: &str, stage: NodeStage) -> Vec<String> {
    let lower = title.to_lowercase();
    let stage_idea = match stage {
        NodeStage::Foundation => "Vocabulary and conceptual boundaries for reliable reasoning.",
        NodeStage::Application => "Implementation mechanics and failure surface of the approach.",
        NodeStage::Integration => "Dependency interactions across earlier nodes.",
        NodeStage::Validation => "Verification criteria, regression checks, evidence traceability.",
    };
    vec![
        format!("Core mechanism of {lower}."),
        format!("Assumptions behind {lower}."),
        stage_idea.to_string(),
    ]
}

fn pitfalls(index: usize, misconceptions: &[String], stage: NodeStage) -> Vec<String> {
    if !misconceptions.is_empty() {
        let current = &misconceptions[index % misconceptions.len()];
        let next = &misconceptions[(index + 1) % misconceptions.len()];
        let mut out = vec![current.clone()];
        if next != current {
            out.push(next.clone());
        }
        return out;
    }
    let stage_pitfall = match stage {
        NodeStage::Foundation => "Skipping precise definitions in favour of vague intuition.",
        NodeStage::Application => "Implementing quickly without checking edge cases.",
        NodeStage::Integration => "Combining components without explicit interface contracts.",
        NodeStage::Validation => "Declaring success without reproducible quality checks.",
    };
    vec![
        stage_pitfall.to_string(),
        "Confusing familiarity with demonstrated mastery.".to_string(),
    ]
}

fn mastery(spec: &TopicSpec, title: &str, index: usize, stage: NodeStage) -> MasteryCheck {
    let pack = spec.context_pack.as_ref();
    let outcome = pack
        .filter(|p| !p.required_outcomes.is_empty())
        .map(|p| format!("produce `{}`", p.required_outcomes[index % p.required_outcomes.len()]))
        .unwrap_or_else(|| "produce a concrete artifact".to_string());
    let anchor = pack
        .filter(|p| !p.local_paths.is_empty())
        .map(|p| format!(" using `{}` as a primary reference", p.local_paths[index % p.local_paths.len()]))
        .unwrap_or_default();

    let (task, pass_criteria) = match stage {
        NodeStage::Foundation => (
            format!(
                "Write a concise technical note for {title}{anchor} to {outcome} that states assumptions and one counterexample."
            ),
            "Pass criteria: must include precise definitions, explicit assumptions, and one counterexample at a real boundary.".to_string(),
        ),
        NodeStage::Application => (
            format!(
                "Implement a minimal working example for {title}{anchor}, run it, then document one failure mode with mitigation."
            ),
            "Pass criteria: the example must run successfully with interpretable output and a documented mitigation.".to_string(),
        ),
        NodeStage::Integration => (
            format!(
                "Integrate {title} with outputs from prerequisite nodes{anchor}, then write an interface decision record."
            ),
            "Pass criteria: integration must be functional with explicit dependencies and at least one evidenced trade-off.".to_string(),
        ),
        NodeStage::Validation => (
            format!(
                "Run a verification pass for {title}{anchor}: include tests, a quality checklist, and a short risk memo."
            ),
            "Pass criteria: include tests with explicit acceptance criteria; every failure must be explained.".to_string(),
        ),
    };
    MasteryCheck { task, pass_criteria }
}

fn resources(spec: &TopicSpec, title: &str, index: usize, stage: NodeStage) -> Vec<Resource> {
    let citation = match spec.evidence_mode {
        EvidenceMode::Strict => Some(format!("{} (template outline, section {})", spec.goal.trim(), index + 1)),
        _ => None,
    };
    let base = format!("notes/{:02}-{}", index + 1, slug(title));

    let mut out = vec![Resource {
        title: format!("{title}: {}", spec.goal.trim()),
        locator: format!("{base}.md"),
        kind: "doc".to_string(),
        role: "definition".to_string(),
        citation: citation.clone(),
        confidence: None,
    }];

    if stage != NodeStage::Foundation {
        out.push(Resource {
            title: format!("{title} worked example"),
            locator: format!("{base}-example.md"),
            kind: "doc".to_string(),
            role: "example".to_string(),
            citation,
            confidence: None,
        });
    }

    if let Some(path) = spec
        .context_pack
        .as_ref()
        .and_then(|p| p.local_paths.get(index))
    {
        out.push(Resource {
            title: format!("{title} local reference"),
            locator: path.clone(),
            kind: "local".to_string(),
            role: "reference".to_string(),
            citation: None,
            confidence: None,
        });
    }

    out
}

fn build_node(spec: &TopicSpec, titles: &[String], weights: &[f64], index: usize) -> CurriculumNode {
    let total = titles.len();
    let title = &titles[index];
    let stage = NodeStage::for_index(index, total);

    let c = &spec.constraints;
    let target_minutes = (c.total_hours_min + c.total_hours_max) / 2.0 * 60.0;
    let weight_sum: f64 = weights.iter().sum();
    let raw = if weight_sum > 0.0 {
        target_minutes * weights[index] / weight_sum
    } else {
        0.0
    };
    let estimate_minutes = ((raw / 5.0).round() * 5.0).max(15.0);
    let estimate_confidence = ((0.6 + index as f64 * 0.025).min(0.9) * 100.0).round() / 100.0;

    CurriculumNode {
        id: node_id(index),
        title: title.clone(),
        capability: capability(title, titles.get(index + 1).map(String::as_str), stage),
        prerequisites: prerequisites(index, total, spec.max_prerequisites()),
        core_ideas: core_ideas(title, stage),
        pitfalls: pitfalls(index, &spec.misconceptions, stage),
        mastery_check: mastery(spec, title, index, stage),
        estimate_minutes,
        estimate_confidence,
        resources: resources(spec, title, index, stage),
    }
}
