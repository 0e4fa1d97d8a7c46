// src/pipeline.rs

//! Pipeline commands over one run.
//!
//! Every command syncs the stage from artifacts first, checks the stage it
//! needs, does its work and syncs again. Fatal errors come back wrapped in
//! [`CompilerError::Halted`] with the stage the run was at, so a caller can
//! resume from there.

use std::collections::BTreeMap;

use tracing::info;

use crate::config::ConfigFile;
use crate::dag::graph::validate;
use crate::dag::{build_plan, compute_diff, DiffReport, Plan};
use crate::engine::{OptimizationLoop, OptimizeResult, StopReason};
use crate::errors::{CompilerError, Result};
use crate::model::{Curriculum, TopicSpec};
use crate::proposal::{FailureKind, Proposer, RegenerationFailure};
use crate::quality::QualityJudge;
use crate::stage::{require_stage, sync_stage, Stage, StageEvaluation, StaleArtifact};
use crate::store::{self, ArtifactKind, RunEvent, RunMeta, RunStore, ValidationMarker};

/// What `status` reports.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatus {
    pub run_id: String,
    pub stage: Stage,
    pub stale: Vec<StaleArtifact>,
    /// Artifact name to presence.
    pub artifacts: BTreeMap<&'static str, bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateSummary {
    pub accepted: bool,
    pub stop_reason: StopReason,
    pub best_score: Option<f64>,
    pub nodes: usize,
    pub stage: Stage,
}

/// Commands bound to one run store and one configuration.
#[derive(Debug)]
pub struct Pipeline<'a> {
    store: &'a dyn RunStore,
    config: &'a ConfigFile,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a dyn RunStore, config: &'a ConfigFile) -> Self {
        Self { store, config }
    }

    /// Create (or re-initialize) a run from a topic spec document.
    ///
    /// The spec must decode and pass its contract checks; nothing is written
    /// otherwise.
    pub fn init(&self, topic_spec_json: &[u8]) -> Result<RunMeta> {
        let stage = self.current_stage();
        self.init_inner(topic_spec_json)
            .map_err(|e| e.halted_at(stage))
    }

    fn init_inner(&self, topic_spec_json: &[u8]) -> Result<RunMeta> {
        let spec: TopicSpec = store::decode(ArtifactKind::TopicSpec, topic_spec_json)?;
        let errors = spec.contract_errors();
        if !errors.is_empty() {
            return Err(CompilerError::contract(
                ArtifactKind::TopicSpec.name(),
                errors.join("; "),
            ));
        }

        let mut meta = match store::load::<RunMeta>(self.store, ArtifactKind::RunMetadata)? {
            Some(existing) => existing,
            None => {
                let meta = RunMeta::new(self.store.run_id());
                store::save(self.store, ArtifactKind::RunMetadata, &meta)?;
                meta
            }
        };

        store::save(self.store, ArtifactKind::TopicSpec, &spec)?;
        self.store.append_event(&RunEvent::new(
            "run_initialized",
            meta.stage,
            format!("topic spec stored for '{}'", spec.goal),
        ))?;
        info!(run = self.store.run_id(), "run initialized");

        sync_stage(self.store, &mut meta)?;
        Ok(meta)
    }

    pub fn status(&self) -> Result<RunStatus> {
        let (meta, evaluation) = self.open()?;
        let artifacts = ArtifactKind::ALL
            .iter()
            .map(|k| (k.name(), self.store.exists(*k)))
            .collect();
        Ok(RunStatus {
            run_id: meta.run_id,
            stage: evaluation.stage,
            stale: evaluation.stale,
            artifacts,
        })
    }

    /// Run the optimization loop and persist its outcome.
    ///
    /// The current curriculum (if any) becomes `previous_curriculum`. The
    /// trace is always written once the loop finishes; the curriculum only
    /// when the loop produced one.
    pub fn generate(&self, proposer: &mut dyn Proposer) -> Result<GenerateSummary> {
        let (mut meta, evaluation) = self.open()?;
        let stage = evaluation.stage;
        self.generate_inner(&mut meta, stage, proposer)
            .map_err(|e| e.halted_at(stage))
    }

    fn generate_inner(
        &self,
        meta: &mut RunMeta,
        stage: Stage,
        proposer: &mut dyn Proposer,
    ) -> Result<GenerateSummary> {
        require_stage(stage, Stage::SpecReady)?;
        let spec: TopicSpec = store::load_required(self.store, ArtifactKind::TopicSpec)?;
        let previous: Option<Curriculum> = store::load(self.store, ArtifactKind::Curriculum)?;

        let optimizer = OptimizationLoop::new(self.config.policy.clone());
        let OptimizeResult {
            curriculum,
            accepted,
            stop_reason,
            trace,
        } = optimizer.run(&spec, previous.as_ref(), proposer);
        let best_score = trace.best_score;

        store::save(self.store, ArtifactKind::OptimizationTrace, &trace)?;

        let Some(curriculum) = curriculum else {
            return Err(RegenerationFailure::new(
                FailureKind::Missing,
                format!("no usable draft ({stop_reason})"),
            )
            .into());
        };

        if let Some(prev) = &previous {
            store::save(self.store, ArtifactKind::PreviousCurriculum, prev)?;
        }
        store::save(self.store, ArtifactKind::Curriculum, &curriculum)?;

        self.store.append_event(
            &RunEvent::new(
                "curriculum_generated",
                stage,
                format!("loop stopped: {stop_reason}"),
            )
            .with("accepted", accepted)
            .with("nodes", curriculum.nodes.len())
            .with("best_score", best_score),
        )?;
        info!(accepted, %stop_reason, nodes = curriculum.nodes.len(), "curriculum written");

        let evaluation = sync_stage(self.store, meta)?;
        Ok(GenerateSummary {
            accepted,
            stop_reason,
            best_score,
            nodes: curriculum.nodes.len(),
            stage: evaluation.stage,
        })
    }

    /// Structural validation plus the hard-fail gate. Writes the validation
    /// marker on success; a failure leaves every artifact in place.
    pub fn validate(&self) -> Result<ValidationMarker> {
        let (mut meta, evaluation) = self.open()?;
        let stage = evaluation.stage;
        self.validate_inner(&mut meta, stage)
            .map_err(|e| e.halted_at(stage))
    }

    fn validate_inner(&self, meta: &mut RunMeta, stage: Stage) -> Result<ValidationMarker> {
        require_stage(stage, Stage::Generated)?;
        let spec: TopicSpec = store::load_required(self.store, ArtifactKind::TopicSpec)?;
        let curriculum: Curriculum = store::load_required(self.store, ArtifactKind::Curriculum)?;

        if let Some(violation) = validate(&curriculum).into_iter().next() {
            return Err(violation.into());
        }

        let report = QualityJudge::new().score(&curriculum, &spec);
        if report.hard_fail_count > 0 {
            let rules: Vec<String> = report
                .diagnostics
                .iter()
                .filter(|d| d.is_hard_fail())
                .map(|d| format!("{} {:?}", d.rule, d.node_ids))
                .collect();
            return Err(CompilerError::ValidationFailed(format!(
                "{} hard-fail diagnostics: {}",
                report.hard_fail_count,
                rules.join(", ")
            )));
        }

        let marker = ValidationMarker::new(curriculum.content_hash(), report.composite_score);
        store::save(self.store, ArtifactKind::ValidationMarker, &marker)?;
        self.store.append_event(
            &RunEvent::new("validated", stage, "curriculum passed validation")
                .with("composite_score", report.composite_score),
        )?;

        sync_stage(self.store, meta)?;
        Ok(marker)
    }

    pub fn plan(&self) -> Result<Plan> {
        let (mut meta, evaluation) = self.open()?;
        let stage = evaluation.stage;
        self.plan_inner(&mut meta, stage)
            .map_err(|e| e.halted_at(stage))
    }

    fn plan_inner(&self, meta: &mut RunMeta, stage: Stage) -> Result<Plan> {
        require_stage(stage, Stage::Validated)?;
        let spec: TopicSpec = store::load_required(self.store, ArtifactKind::TopicSpec)?;
        let curriculum: Curriculum = store::load_required(self.store, ArtifactKind::Curriculum)?;

        let plan = build_plan(&spec, &curriculum, &self.config.planner)?;
        store::save(self.store, ArtifactKind::Plan, &plan)?;
        self.store.append_event(
            &RunEvent::new("planned", stage, format!("{} weeks", plan.duration_weeks))
                .with("total_minutes", plan.total_estimated_minutes),
        )?;

        sync_stage(self.store, meta)?;
        Ok(plan)
    }

    /// Diff the current curriculum against the previous one, or against an
    /// empty curriculum on a first iteration.
    pub fn iterate(&self) -> Result<DiffReport> {
        let (mut meta, evaluation) = self.open()?;
        let stage = evaluation.stage;
        self.iterate_inner(&mut meta, stage)
            .map_err(|e| e.halted_at(stage))
    }

    fn iterate_inner(&self, meta: &mut RunMeta, stage: Stage) -> Result<DiffReport> {
        require_stage(stage, Stage::Planned)?;
        let current: Curriculum = store::load_required(self.store, ArtifactKind::Curriculum)?;
        let previous: Curriculum = store::load(self.store, ArtifactKind::PreviousCurriculum)?
            .unwrap_or_else(|| Curriculum::empty(current.topic.clone()));

        let diff = compute_diff(&previous, &current)?;
        store::save(self.store, ArtifactKind::DiffReport, &diff)?;
        self.store.append_event(
            &RunEvent::new("iterated", stage, "diff report written")
                .with("added", diff.added.len())
                .with("removed", diff.removed.len())
                .with("time_delta_minutes", diff.time_delta_minutes),
        )?;

        sync_stage(self.store, meta)?;
        Ok(diff)
    }

    /// Every command in order: init (when a spec is given), generate,
    /// validate, plan, iterate.
    pub fn run(
        &self,
        topic_spec_json: Option<&[u8]>,
        proposer: &mut dyn Proposer,
    ) -> Result<Stage> {
        if let Some(bytes) = topic_spec_json {
            self.init(bytes)?;
        }
        self.generate(proposer)?;
        self.validate()?;
        self.plan()?;
        self.iterate()?;
        Ok(self.open()?.1.stage)
    }

    /// Load run metadata and sync the stage.
    fn open(&self) -> Result<(RunMeta, StageEvaluation)> {
        let mut meta: RunMeta = store::load(self.store, ArtifactKind::RunMetadata)
            .map_err(|e| e.halted_at(Stage::Initialized))?
            .ok_or_else(|| {
                CompilerError::RunNotFound(self.store.run_id().to_string())
                    .halted_at(Stage::Initialized)
            })?;
        let stage = meta.stage;
        let evaluation = sync_stage(self.store, &mut meta).map_err(|e| e.halted_at(stage))?;
        Ok((meta, evaluation))
    }

    /// Stage of an existing run, `initialized` otherwise.
    fn current_stage(&self) -> Stage {
        store::load::<RunMeta>(self.store, ArtifactKind::RunMetadata)
            .ok()
            .flatten()
            .map(|m| m.stage)
            .unwrap_or(Stage::Initialized)
    }
}
