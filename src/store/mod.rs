// src/store/mod.rs

//! Run store: artifact and event persistence keyed by run id.
//!
//! The pipeline talks to a [`RunStore`] only. [`FsRunStore`] lays a run out
//! under `<runs_dir>/<run_id>/`; [`MemoryRunStore`] keeps everything in
//! memory with a logical clock, so freshness comparisons are exact.
//!
//! Documents are JSON with an explicit `schema_version`. Reading a document
//! whose version is missing or different fails with
//! [`CompilerError::ContractInvalid`]; no migration is attempted.

use std::fmt::{self, Debug};
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::dag::diff::DIFF_SCHEMA_VERSION;
use crate::dag::plan::PLAN_SCHEMA_VERSION;
use crate::engine::TRACE_SCHEMA_VERSION;
use crate::errors::{CompilerError, Result};
use crate::model::{CURRICULUM_SCHEMA_VERSION, TOPIC_SPEC_SCHEMA_VERSION};

pub mod fs;
pub mod memory;
pub mod meta;

pub use fs::FsRunStore;
pub use memory::MemoryRunStore;
pub use meta::{RunEvent, RunMeta, ValidationMarker, RUN_META_SCHEMA_VERSION, VALIDATION_SCHEMA_VERSION};

/// Persisted artifact kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    TopicSpec,
    Curriculum,
    PreviousCurriculum,
    OptimizationTrace,
    Plan,
    DiffReport,
    ValidationMarker,
    RunMetadata,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 8] = [
        ArtifactKind::TopicSpec,
        ArtifactKind::Curriculum,
        ArtifactKind::PreviousCurriculum,
        ArtifactKind::OptimizationTrace,
        ArtifactKind::Plan,
        ArtifactKind::DiffReport,
        ArtifactKind::ValidationMarker,
        ArtifactKind::RunMetadata,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArtifactKind::TopicSpec => "topic_spec",
            ArtifactKind::Curriculum => "curriculum",
            ArtifactKind::PreviousCurriculum => "previous_curriculum",
            ArtifactKind::OptimizationTrace => "optimization_trace",
            ArtifactKind::Plan => "plan",
            ArtifactKind::DiffReport => "diff_report",
            ArtifactKind::ValidationMarker => "validation_marker",
            ArtifactKind::RunMetadata => "run_metadata",
        }
    }

    /// Location relative to the run directory.
    pub fn relative_path(self) -> &'static str {
        match self {
            ArtifactKind::TopicSpec => "inputs/topic_spec.json",
            ArtifactKind::Curriculum => "outputs/curriculum/curriculum.json",
            ArtifactKind::PreviousCurriculum => "outputs/curriculum/previous_curriculum.json",
            ArtifactKind::OptimizationTrace => "outputs/reviews/optimization_trace.json",
            ArtifactKind::Plan => "outputs/plan/plan.json",
            ArtifactKind::DiffReport => "outputs/reviews/diff_report.json",
            ArtifactKind::ValidationMarker => "logs/validation.ok",
            ArtifactKind::RunMetadata => "run.json",
        }
    }

    /// Schema version a document of this kind must carry.
    pub fn schema_version(self) -> u32 {
        match self {
            ArtifactKind::TopicSpec => TOPIC_SPEC_SCHEMA_VERSION,
            ArtifactKind::Curriculum | ArtifactKind::PreviousCurriculum => {
                CURRICULUM_SCHEMA_VERSION
            }
            ArtifactKind::OptimizationTrace => TRACE_SCHEMA_VERSION,
            ArtifactKind::Plan => PLAN_SCHEMA_VERSION,
            ArtifactKind::DiffReport => DIFF_SCHEMA_VERSION,
            ArtifactKind::ValidationMarker => VALIDATION_SCHEMA_VERSION,
            ArtifactKind::RunMetadata => RUN_META_SCHEMA_VERSION,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Artifact persistence for a single run.
///
/// Single writer per run id; callers serialize concurrent invocations.
pub trait RunStore: Send + Sync + Debug {
    fn run_id(&self) -> &str;

    /// Raw bytes, or `None` when the artifact was never written.
    fn read_artifact(&self, kind: ArtifactKind) -> Result<Option<Vec<u8>>>;

    fn write_artifact(&self, kind: ArtifactKind, bytes: &[u8]) -> Result<()>;

    /// Last write time, or `None` when absent.
    fn artifact_mtime(&self, kind: ArtifactKind) -> Option<SystemTime>;

    /// Append one line to the run's event log.
    fn append_event(&self, event: &RunEvent) -> Result<()>;

    fn exists(&self, kind: ArtifactKind) -> bool {
        self.artifact_mtime(kind).is_some()
    }
}

/// Serialize `doc` as pretty JSON with a trailing newline.
///
/// Struct fields serialize in declaration order and maps are `BTreeMap`s,
/// so equal documents always produce identical bytes.
pub fn encode<T: Serialize>(doc: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(doc)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a document of `kind`, checking its `schema_version` first.
pub fn decode<T: DeserializeOwned>(kind: ArtifactKind, bytes: &[u8]) -> Result<T> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| CompilerError::contract(kind.name(), format!("not valid JSON: {e}")))?;

    let expected = kind.schema_version();
    match value.get("schema_version").and_then(serde_json::Value::as_u64) {
        Some(v) if v == u64::from(expected) => {}
        Some(v) => {
            return Err(CompilerError::contract(
                kind.name(),
                format!("unsupported schema_version {v} (expected {expected})"),
            ));
        }
        None => {
            return Err(CompilerError::contract(
                kind.name(),
                "missing schema_version",
            ));
        }
    }

    serde_json::from_value(value).map_err(|e| CompilerError::contract(kind.name(), e.to_string()))
}

/// Read and decode an artifact; `None` when absent.
pub fn load<T: DeserializeOwned>(store: &dyn RunStore, kind: ArtifactKind) -> Result<Option<T>> {
    match store.read_artifact(kind)? {
        Some(bytes) => decode(kind, &bytes).map(Some),
        None => Ok(None),
    }
}

/// Read and decode an artifact that must exist.
pub fn load_required<T: DeserializeOwned>(store: &dyn RunStore, kind: ArtifactKind) -> Result<T> {
    load(store, kind)?
        .ok_or_else(|| CompilerError::contract(kind.name(), "artifact is missing"))
}

pub fn save<T: Serialize>(store: &dyn RunStore, kind: ArtifactKind, doc: &T) -> Result<()> {
    let bytes = encode(doc)?;
    store.write_artifact(kind, &bytes)?;
    debug!(run = store.run_id(), artifact = %kind, bytes = bytes.len(), "artifact written");
    Ok(())
}

/// Run ids become directory names: ASCII alphanumerics, `-`, `_` and `.`,
/// not starting with a dot.
pub fn validate_run_id(run_id: &str) -> Result<()> {
    let ok = !run_id.is_empty()
        && run_id.len() <= 128
        && !run_id.starts_with('.')
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(CompilerError::Config(format!(
            "invalid run id '{run_id}': use letters, digits, '-', '_' or '.'"
        )))
    }
}
