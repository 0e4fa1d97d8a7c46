// src/config/model.rs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::ProposerKind;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [policy]
/// max_iterations = 4
/// target_score = 82.0
///
/// [planner]
/// min_weeks = 2
/// max_weeks = 4
///
/// [proposer]
/// kind = "command"
/// cmd = "python3 propose.py"
///
/// [store]
/// runs_dir = "runs"
/// ```
///
/// All sections are optional and have defaults. Turn it into a
/// [`ConfigFile`] with `ConfigFile::try_from`, which validates ranges.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub policy: PolicySection,

    #[serde(default)]
    pub planner: PlannerSection,

    #[serde(default)]
    pub proposer: ProposerSection,

    #[serde(default)]
    pub store: StoreSection,
}

/// Validated configuration. Only constructed through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub policy: PolicySection,
    pub planner: PlannerSection,
    pub proposer: ProposerSection,
    pub store: StoreSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            policy: raw.policy,
            planner: raw.planner,
            proposer: raw.proposer,
            store: raw.store,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[policy]` section: optimization loop bounds and acceptance thresholds.
///
/// Snapshotted into every trace record, so it serializes as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySection {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Upper bound on repair actions chosen per iteration.
    #[serde(default = "default_max_actions_per_iteration")]
    pub max_actions_per_iteration: usize,

    /// Composite score needed for acceptance (0..=100).
    #[serde(default = "default_target_score")]
    pub target_score: f64,

    /// Floor for the `learner_path_coherence` dimension.
    #[serde(default = "default_min_pedagogy_score")]
    pub min_pedagogy_score: f64,

    /// Consecutive zero-action iterations before the loop plateaus.
    #[serde(default = "default_plateau_window")]
    pub plateau_window: u32,

    /// Failed proposal calls tolerated over one loop run.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Per proposal call.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_max_iterations() -> u32 {
    4
}

fn default_max_actions_per_iteration() -> usize {
    4
}

fn default_target_score() -> f64 {
    82.0
}

fn default_min_pedagogy_score() -> f64 {
    72.0
}

fn default_plateau_window() -> u32 {
    2
}

fn default_retry_budget() -> u32 {
    2
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_actions_per_iteration: default_max_actions_per_iteration(),
            target_score: default_target_score(),
            min_pedagogy_score: default_min_pedagogy_score(),
            plateau_window: default_plateau_window(),
            retry_budget: default_retry_budget(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// `[planner]` section: bounds on the week count of a plan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlannerSection {
    #[serde(default = "default_min_weeks")]
    pub min_weeks: u32,

    #[serde(default = "default_max_weeks")]
    pub max_weeks: u32,
}

fn default_min_weeks() -> u32 {
    2
}

fn default_max_weeks() -> u32 {
    4
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            min_weeks: default_min_weeks(),
            max_weeks: default_max_weeks(),
        }
    }
}

/// `[proposer]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProposerSection {
    #[serde(default)]
    pub kind: ProposerKind,

    /// Shell command for `kind = "command"`.
    #[serde(default)]
    pub cmd: Option<String>,
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_runs_dir")]
    pub runs_dir: PathBuf,
}

fn default_runs_dir() -> PathBuf {
    PathBuf::from("runs")
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            runs_dir: default_runs_dir(),
        }
    }
}
