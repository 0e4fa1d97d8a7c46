// src/model/topic_spec.rs

//! Topic specification: the declarative input the whole pipeline compiles.

use serde::{Deserialize, Serialize};

use crate::types::{Depth, DomainMode, EvidenceMode};

pub const TOPIC_SPEC_SCHEMA_VERSION: u32 = 1;

const PLACEHOLDER_TOKENS: [&str; 3] = ["replace_with", "todo", "tbd"];

/// Planner and judge constraints from the `constraints` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub hours_per_week: f64,
    pub total_hours_min: f64,
    pub total_hours_max: f64,
    #[serde(default)]
    pub depth: Depth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_count_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_count_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_prerequisites_per_node: Option<u32>,
}

impl Constraints {
    pub fn weekly_budget_minutes(&self) -> f64 {
        self.hours_per_week * 60.0
    }
}

/// Optional domain hints used for resource relevance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextPack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub focus_terms: Vec<String>,
    #[serde(default)]
    pub local_paths: Vec<String>,
    #[serde(default)]
    pub preferred_resource_kinds: Vec<String>,
    #[serde(default)]
    pub required_outcomes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSpec {
    pub schema_version: u32,
    pub goal: String,
    pub audience: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub scope_in: Vec<String>,
    #[serde(default)]
    pub scope_out: Vec<String>,
    #[serde(default)]
    pub misconceptions: Vec<String>,
    pub constraints: Constraints,
    #[serde(default)]
    pub domain_mode: DomainMode,
    #[serde(default)]
    pub evidence_mode: EvidenceMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_pack: Option<ContextPack>,
}

impl TopicSpec {
    /// Every contract violation, in a stable order. Empty means ready.
    pub fn contract_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.schema_version != TOPIC_SPEC_SCHEMA_VERSION {
            errors.push(format!(
                "schema_version must be {TOPIC_SPEC_SCHEMA_VERSION} (got {})",
                self.schema_version
            ));
        }

        for (field, value) in [("goal", &self.goal), ("audience", &self.audience)] {
            if value.trim().is_empty() {
                errors.push(format!("{field} must be a non-empty string"));
            } else if looks_placeholder(value) {
                errors.push(format!("{field} must not use placeholder text"));
            }
        }

        if self.scope_in.is_empty() {
            errors.push("scope_in must list at least one item".to_string());
        }

        for (field, items) in [
            ("prerequisites", &self.prerequisites),
            ("scope_in", &self.scope_in),
            ("scope_out", &self.scope_out),
            ("misconceptions", &self.misconceptions),
        ] {
            for (idx, item) in items.iter().enumerate() {
                if item.trim().is_empty() {
                    errors.push(format!("{field}[{idx}] must be a non-empty string"));
                }
            }
        }

        let c = &self.constraints;
        for (field, value) in [
            ("hours_per_week", c.hours_per_week),
            ("total_hours_min", c.total_hours_min),
            ("total_hours_max", c.total_hours_max),
        ] {
            if !value.is_finite() || value <= 0.0 {
                errors.push(format!("constraints.{field} must be > 0"));
            }
        }
        if c.total_hours_min > c.total_hours_max {
            errors.push(
                "constraints.total_hours_min must be <= constraints.total_hours_max".to_string(),
            );
        }
        if let (Some(min), Some(max)) = (c.node_count_min, c.node_count_max) {
            if min > max {
                errors.push(
                    "constraints.node_count_min must be <= constraints.node_count_max".to_string(),
                );
            }
        }
        if c.max_prerequisites_per_node == Some(0) {
            errors.push("constraints.max_prerequisites_per_node must be >= 1".to_string());
        }

        errors
    }

    pub fn is_ready(&self) -> bool {
        self.contract_errors().is_empty()
    }

    /// Lowercased text the judge matches resources against.
    pub fn relevance_corpus(&self) -> String {
        let mut parts: Vec<&str> = vec![self.goal.as_str()];
        parts.extend(self.scope_in.iter().map(String::as_str));
        if let Some(pack) = &self.context_pack {
            parts.extend(pack.focus_terms.iter().map(String::as_str));
            if let Some(domain) = &pack.domain {
                parts.push(domain.as_str());
            }
        }
        parts.join(" ").to_lowercase()
    }

    /// Prerequisite cap from constraints, or the default of 3.
    pub fn max_prerequisites(&self) -> usize {
        self.constraints
            .max_prerequisites_per_node
            .map(|v| v as usize)
            .unwrap_or(3)
    }
}

fn looks_placeholder(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    PLACEHOLDER_TOKENS.iter().any(|t| lowered.contains(t))
}
