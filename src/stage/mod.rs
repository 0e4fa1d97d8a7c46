// src/stage/mod.rs

//! Pipeline stage as a pure function of artifact freshness.
//!
//! The stage stored in `run.json` is only a cache: [`infer_stage`]
//! recomputes it from modification times, and [`sync_stage`] overwrites the
//! cache when the two disagree. Editing an upstream artifact therefore
//! downgrades every stage that depended on it, without any invalidation
//! code and without deleting anything.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{CompilerError, Result};
use crate::model::TopicSpec;
use crate::store::{self, ArtifactKind, RunEvent, RunMeta, RunStore};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initialized,
    SpecReady,
    Generated,
    Validated,
    Planned,
    Iterated,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Initialized => "initialized",
            Stage::SpecReady => "spec_ready",
            Stage::Generated => "generated",
            Stage::Validated => "validated",
            Stage::Planned => "planned",
            Stage::Iterated => "iterated",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything stage inference looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageInputs {
    /// Topic spec exists and passes its contract checks.
    pub spec_ready: bool,
    pub topic_spec: Option<SystemTime>,
    pub curriculum: Option<SystemTime>,
    pub previous_curriculum: Option<SystemTime>,
    pub validation_marker: Option<SystemTime>,
    pub plan: Option<SystemTime>,
    pub diff_report: Option<SystemTime>,
}

impl StageInputs {
    fn mtime(&self, kind: ArtifactKind) -> Option<SystemTime> {
        match kind {
            ArtifactKind::TopicSpec => self.topic_spec,
            ArtifactKind::Curriculum => self.curriculum,
            ArtifactKind::PreviousCurriculum => self.previous_curriculum,
            ArtifactKind::ValidationMarker => self.validation_marker,
            ArtifactKind::Plan => self.plan,
            ArtifactKind::DiffReport => self.diff_report,
            ArtifactKind::OptimizationTrace | ArtifactKind::RunMetadata => None,
        }
    }
}

/// An artifact older than one of its declared inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleArtifact {
    pub artifact: String,
    pub newer_input: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEvaluation {
    pub stage: Stage,
    pub stale: Vec<StaleArtifact>,
}

/// Declared input of an artifact.
struct Input {
    kind: ArtifactKind,
    optional: bool,
}

const fn required(kind: ArtifactKind) -> Input {
    Input {
        kind,
        optional: false,
    }
}

/// Gates in stage order: reaching `stage` needs `artifact` fresh against
/// `inputs`.
const GATES: [(Stage, ArtifactKind, &[Input]); 4] = [
    (
        Stage::Generated,
        ArtifactKind::Curriculum,
        &[required(ArtifactKind::TopicSpec)],
    ),
    (
        Stage::Validated,
        ArtifactKind::ValidationMarker,
        &[
            required(ArtifactKind::TopicSpec),
            required(ArtifactKind::Curriculum),
        ],
    ),
    (
        Stage::Planned,
        ArtifactKind::Plan,
        &[
            required(ArtifactKind::TopicSpec),
            required(ArtifactKind::Curriculum),
        ],
    ),
    (
        Stage::Iterated,
        ArtifactKind::DiffReport,
        &[
            required(ArtifactKind::Curriculum),
            Input {
                kind: ArtifactKind::PreviousCurriculum,
                optional: true,
            },
        ],
    ),
];

/// Check one artifact against its inputs. Returns whether it is current,
/// pushing a stale entry for every input newer than it.
fn check_fresh(
    inputs: &StageInputs,
    artifact: ArtifactKind,
    declared: &[Input],
    stale: &mut Vec<StaleArtifact>,
) -> bool {
    let Some(own) = inputs.mtime(artifact) else {
        return false;
    };
    let mut fresh = true;
    for input in declared {
        match inputs.mtime(input.kind) {
            Some(t) if t > own => {
                stale.push(StaleArtifact {
                    artifact: artifact.name().to_string(),
                    newer_input: input.kind.name().to_string(),
                });
                fresh = false;
            }
            Some(_) => {}
            None if input.optional => {}
            None => fresh = false,
        }
    }
    fresh
}

/// Infer the stage from artifact state.
///
/// Checks run top to bottom and the first failing one decides. Stale
/// entries are collected for every artifact that exists, so a caller can
/// see everything an upstream edit invalidated.
pub fn infer_stage(inputs: &StageInputs) -> StageEvaluation {
    let mut stale = Vec::new();
    let mut stage = if inputs.spec_ready {
        Stage::SpecReady
    } else {
        Stage::Initialized
    };
    let mut blocked = !inputs.spec_ready;

    for (gate, artifact, declared) in GATES {
        let fresh = check_fresh(inputs, artifact, declared, &mut stale);
        if !blocked && fresh {
            stage = gate;
        } else {
            blocked = true;
        }
    }

    StageEvaluation { stage, stale }
}

/// Gather [`StageInputs`] from a store.
///
/// A topic spec that does not decode is a contract error; one that decodes
/// but fails its own checks simply leaves the run `initialized`.
pub fn collect_inputs(store: &dyn RunStore) -> Result<StageInputs> {
    let spec: Option<TopicSpec> = store::load(store, ArtifactKind::TopicSpec)?;
    Ok(StageInputs {
        spec_ready: spec.as_ref().is_some_and(TopicSpec::is_ready),
        topic_spec: store.artifact_mtime(ArtifactKind::TopicSpec),
        curriculum: store.artifact_mtime(ArtifactKind::Curriculum),
        previous_curriculum: store.artifact_mtime(ArtifactKind::PreviousCurriculum),
        validation_marker: store.artifact_mtime(ArtifactKind::ValidationMarker),
        plan: store.artifact_mtime(ArtifactKind::Plan),
        diff_report: store.artifact_mtime(ArtifactKind::DiffReport),
    })
}

/// Re-derive the stage and persist it when it changed.
pub fn sync_stage(store: &dyn RunStore, meta: &mut RunMeta) -> Result<StageEvaluation> {
    let evaluation = infer_stage(&collect_inputs(store)?);

    for s in &evaluation.stale {
        warn!(artifact = %s.artifact, newer_input = %s.newer_input, "stale artifact");
    }

    if evaluation.stage != meta.stage {
        info!(run = store.run_id(), from = %meta.stage, to = %evaluation.stage, "stage changed");
        let event = RunEvent::new(
            "stage_transition",
            evaluation.stage,
            format!("auto-sync from artifacts (was {})", meta.stage),
        )
        .with("from", meta.stage.as_str())
        .with("to", evaluation.stage.as_str());
        meta.stage = evaluation.stage;
        meta.history.push(event.clone());
        store::save(store, ArtifactKind::RunMetadata, meta)?;
        store.append_event(&event)?;
    }

    Ok(evaluation)
}

/// Fail with [`CompilerError::StageConflict`] unless `actual >= required`.
pub fn require_stage(actual: Stage, required: Stage) -> Result<()> {
    if actual >= required {
        Ok(())
    } else {
        Err(CompilerError::StageConflict { required, actual })
    }
}
