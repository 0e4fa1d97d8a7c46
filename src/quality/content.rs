// src/quality/content.rs

//! Node-content rule families: resources, mastery checks, effort, redundancy.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::model::{tokens, Curriculum, TopicSpec};
use crate::quality::diagnostic::{Diagnostic, Findings, Rule};

const ACTION_VERBS: &str = r"\b(?:analyze|build|compare|define|design|document|explain|implement|integrate|measure|run|simulate|test|validate|write)\s";

const MEASURABLE_SIGNALS: [&str; 6] = ["must ", "at least", "include", "pass", "threshold", "criteria"];

const SIMILARITY_THRESHOLD: f64 = 0.85;

static ACTION_VERB_RE: LazyLock<Option<Regex>> = LazyLock::new(|| match Regex::new(ACTION_VERBS) {
    Ok(r) => Some(r),
    Err(e) => {
        warn!(error = %e, "invalid action verb pattern; mastery verb check disabled");
        None
    }
});

pub(crate) fn score_resource_relevance(
    curriculum: &Curriculum,
    spec: &TopicSpec,
) -> (f64, Vec<Diagnostic>) {
    let mut findings = Findings::new();
    let corpus = tokens(&spec.relevance_corpus());

    let mut holders: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut duplicates = 0usize;

    for node in &curriculum.nodes {
        if node.resources.is_empty() {
            findings.flag(
                Rule::ResourceMissing,
                vec![node.id.clone()],
                "node has no resources",
                18.0,
            );
            continue;
        }

        let material = node
            .resources
            .iter()
            .map(|r| format!("{} {}", r.title, r.locator))
            .collect::<Vec<_>>()
            .join(" ");
        if !corpus.is_empty() && tokens(&material).is_disjoint(&corpus) {
            findings.flag(
                Rule::WeakRelevance,
                vec![node.id.clone()],
                "weak overlap between resources and topic context",
                8.0,
            );
        }

        for resource in &node.resources {
            let entry = holders.entry(resource.locator.as_str()).or_default();
            if !entry.is_empty() {
                duplicates += 1;
            }
            entry.insert(node.id.as_str());
        }
    }

    if duplicates > (curriculum.nodes.len() / 2).max(2) {
        let repeated: BTreeSet<String> = holders
            .values()
            .filter(|ids| ids.len() > 1)
            .flat_map(|ids| ids.iter().map(|s| s.to_string()))
            .collect();
        findings.flag(
            Rule::RepetitiveAnchor,
            repeated.into_iter().collect(),
            format!("{duplicates} resource locators repeat across nodes"),
            10.0,
        );
    }

    findings.finish()
}

fn is_actionable(task: &str) -> bool {
    let task = task.trim().to_lowercase();
    if task.len() < 20 {
        return false;
    }
    match ACTION_VERB_RE.as_ref() {
        Some(re) => re.is_match(&task),
        None => true,
    }
}

fn is_measurable(criteria: &str) -> bool {
    let criteria = criteria.trim().to_lowercase();
    criteria.len() >= 20 && MEASURABLE_SIGNALS.iter().any(|s| criteria.contains(s))
}

pub(crate) fn score_mastery_actionability(curriculum: &Curriculum) -> (f64, Vec<Diagnostic>) {
    let mut findings = Findings::new();

    for node in &curriculum.nodes {
        if !is_actionable(&node.mastery_check.task) {
            findings.flag(
                Rule::NonActionableTask,
                vec![node.id.clone()],
                "mastery task is not specific enough to act on",
                12.0,
            );
        }
        if !is_measurable(&node.mastery_check.pass_criteria) {
            findings.flag(
                Rule::NonMeasurableCriteria,
                vec![node.id.clone()],
                "pass criteria lack a measurable acceptance signal",
                12.0,
            );
        }
    }

    findings.finish()
}

pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub(crate) fn score_effort_coherence(
    curriculum: &Curriculum,
    spec: &TopicSpec,
) -> (f64, Vec<Diagnostic>) {
    let mut findings = Findings::new();
    let mut estimates: Vec<(&str, f64)> = Vec::new();

    for node in &curriculum.nodes {
        let minutes_ok = node.estimate_minutes.is_finite() && node.estimate_minutes >= 0.0;
        let confidence_ok = (0.0..=1.0).contains(&node.estimate_confidence);
        if !minutes_ok || !confidence_ok {
            findings.flag(
                Rule::InvalidEstimate,
                vec![node.id.clone()],
                format!(
                    "estimate {} min at confidence {} is out of range",
                    node.estimate_minutes, node.estimate_confidence
                ),
                20.0,
            );
        }
        if minutes_ok {
            estimates.push((node.id.as_str(), node.estimate_minutes));
        }
    }

    if estimates.is_empty() {
        findings.penalize(100.0);
        return findings.finish();
    }

    let c = &spec.constraints;
    let total_minutes: f64 = estimates.iter().map(|(_, m)| m).sum();
    let total_hours = (total_minutes / 60.0 * 100.0).round() / 100.0;
    if total_hours < c.total_hours_min || total_hours > c.total_hours_max {
        findings.flag(
            Rule::TotalHours,
            Vec::new(),
            format!(
                "derived total hours {total_hours} outside [{}, {}]",
                c.total_hours_min, c.total_hours_max
            ),
            20.0,
        );
    }

    let unique: BTreeSet<u64> = estimates.iter().map(|(_, m)| m.to_bits()).collect();
    if estimates.len() >= 6 && unique.len() <= 2 {
        findings.flag(
            Rule::FlatDistribution,
            Vec::new(),
            "estimate distribution is too flat for curriculum size",
            25.0,
        );
    }

    let values: Vec<f64> = estimates.iter().map(|(_, m)| *m).collect();
    let med = median(&values);
    if med > 0.0 {
        let outliers: Vec<String> = estimates
            .iter()
            .filter(|(_, m)| *m > med * 3.0)
            .map(|(id, _)| id.to_string())
            .collect();
        if !outliers.is_empty() {
            findings.flag(
                Rule::EffortOutlier,
                outliers,
                format!("estimates above 3x the median of {med} min"),
                10.0,
            );
        }
    }

    findings.finish()
}

fn title_prefix(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(5)
        .collect::<Vec<_>>()
        .join(" ")
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

pub(crate) fn score_redundancy(curriculum: &Curriculum) -> (f64, Vec<Diagnostic>) {
    let mut findings = Findings::new();
    let n = curriculum.nodes.len();

    let mut by_prefix: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for node in &curriculum.nodes {
        by_prefix
            .entry(title_prefix(&node.title))
            .or_default()
            .push(node.id.as_str());
    }
    if n >= 6 && by_prefix.len() <= (n / 3).max(2) {
        let mut repeated: Vec<String> = by_prefix
            .values()
            .filter(|ids| ids.len() > 1)
            .flat_map(|ids| ids.iter().map(|s| s.to_string()))
            .collect();
        repeated.sort();
        findings.flag(
            Rule::TitleRepetition,
            repeated,
            format!("{n} nodes share only {} title prefixes", by_prefix.len()),
            25.0,
        );
    }

    let mut sorted: Vec<_> = curriculum.nodes.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    let fingerprints: Vec<(&str, BTreeSet<String>)> = sorted
        .iter()
        .map(|node| (node.id.as_str(), tokens(&node.capability)))
        .collect();

    for (i, (a_id, a)) in fingerprints.iter().enumerate() {
        for (b_id, b) in &fingerprints[i + 1..] {
            if a.len() < 3 || b.len() < 3 || a_id == b_id {
                continue;
            }
            let similarity = jaccard(a, b);
            if similarity >= SIMILARITY_THRESHOLD {
                findings.flag(
                    Rule::TemplateSimilarity,
                    vec![a_id.to_string(), b_id.to_string()],
                    format!("capabilities are {:.0}% lexically identical", similarity * 100.0),
                    10.0,
                );
            }
        }
    }

    findings.finish()
}
