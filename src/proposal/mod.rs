// src/proposal/mod.rs

//! Boundary to the proposal collaborator that drafts and regenerates nodes.
//!
//! The optimization loop only sees [`Proposer`]: a blocking call that
//! returns either a schema-valid document or a typed
//! [`RegenerationFailure`]. Two backends ship with the crate:
//!
//! - [`TemplateProposer`]: deterministic, offline.
//! - [`CommandProposer`]: external process speaking JSON over stdin/stdout.

pub mod command;
pub mod template;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Curriculum, CurriculumContext, CurriculumNode, TopicSpec};
use crate::quality::Diagnostic;

pub use command::CommandProposer;
pub use template::TemplateProposer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No answer within the configured timeout.
    Timeout,
    /// Answer did not parse as the expected document.
    Malformed,
    /// Empty answer, or the requested node was absent.
    Missing,
    /// The collaborator signalled failure (e.g. non-zero exit).
    Rejected,
    /// The collaborator could not be started.
    Spawn,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Malformed => "malformed response",
            FailureKind::Missing => "missing response",
            FailureKind::Rejected => "rejected",
            FailureKind::Spawn => "spawn failure",
        };
        f.write_str(s)
    }
}

/// The collaborator produced nothing usable for one request.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RegenerationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl RegenerationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Drafts whole curricula and regenerates single nodes.
///
/// Calls are blocking; implementations enforce their own timeout and
/// report it as [`FailureKind::Timeout`].
pub trait Proposer {
    /// Draft a full curriculum. `context` is the compact summary of the
    /// previous version (empty on a first run).
    fn propose(
        &mut self,
        spec: &TopicSpec,
        context: &CurriculumContext,
    ) -> Result<Curriculum, RegenerationFailure>;

    /// Rebuild one node, given the diagnostics that mention it.
    fn regenerate_node(
        &mut self,
        node_id: &str,
        diagnostics: &[Diagnostic],
        context: &CurriculumContext,
    ) -> Result<CurriculumNode, RegenerationFailure>;
}

impl<P: Proposer + ?Sized> Proposer for Box<P> {
    fn propose(
        &mut self,
        spec: &TopicSpec,
        context: &CurriculumContext,
    ) -> Result<Curriculum, RegenerationFailure> {
        (**self).propose(spec, context)
    }

    fn regenerate_node(
        &mut self,
        node_id: &str,
        diagnostics: &[Diagnostic],
        context: &CurriculumContext,
    ) -> Result<CurriculumNode, RegenerationFailure> {
        (**self).regenerate_node(node_id, diagnostics, context)
    }
}
