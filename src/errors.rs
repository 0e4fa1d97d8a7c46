// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::dag::graph::StructuralViolation;
use crate::proposal::RegenerationFailure;
use crate::stage::Stage;

#[derive(Error, Debug)]
pub enum CompilerError {
    /// Cyclic or dangling-reference graph. Fatal, never retried.
    #[error("structural violation: {0}")]
    Structural(#[from] StructuralViolation),

    /// The proposal collaborator produced nothing usable and there is
    /// nothing left to persist.
    #[error("proposal failed: {0}")]
    Regeneration(#[from] RegenerationFailure),

    /// A topic spec or persisted artifact failed its schema/version checks.
    #[error("invalid {artifact}: {reason}")]
    ContractInvalid { artifact: String, reason: String },

    /// The curriculum still carries hard-fail diagnostics.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// A command was invoked before the stage it needs holds.
    #[error("stage conflict: requires {required}, run is at {actual}")]
    StageConflict { required: Stage, actual: Stage },

    /// Fatal error wrapped with the stage the run stopped at.
    #[error("run halted at stage {stage}: {source}")]
    Halted {
        stage: Stage,
        #[source]
        source: Box<CompilerError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CompilerError {
    pub fn contract(artifact: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ContractInvalid {
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }

    /// Attach the stage the run stopped at. Already-halted errors keep
    /// their original stage.
    pub fn halted_at(self, stage: Stage) -> Self {
        match self {
            halted @ CompilerError::Halted { .. } => halted,
            other => CompilerError::Halted {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage a halted error stopped at, if any.
    pub fn halted_stage(&self) -> Option<Stage> {
        match self {
            CompilerError::Halted { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CompilerError>;
