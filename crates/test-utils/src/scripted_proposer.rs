use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use lessondag::model::{Curriculum, CurriculumContext, CurriculumNode, TopicSpec};
use lessondag::proposal::{FailureKind, Proposer, RegenerationFailure};
use lessondag::quality::Diagnostic;

/// A fake proposal collaborator that:
/// - answers `propose` from a queue of scripted results (the last one
///   repeats once the queue runs dry)
/// - answers `regenerate_node` from per-node queues, failing with
///   `Missing` when nothing is scripted
/// - records every call as `propose` or `regenerate:<id>`.
#[derive(Debug, Default)]
pub struct ScriptedProposer {
    drafts: VecDeque<Result<Curriculum, RegenerationFailure>>,
    last_draft: Option<Result<Curriculum, RegenerationFailure>>,
    nodes: BTreeMap<String, VecDeque<Result<CurriculumNode, RegenerationFailure>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_draft(mut self, draft: Curriculum) -> Self {
        self.drafts.push_back(Ok(draft));
        self
    }

    pub fn with_draft_failure(mut self, kind: FailureKind, message: &str) -> Self {
        self.drafts
            .push_back(Err(RegenerationFailure::new(kind, message)));
        self
    }

    pub fn with_node(self, node: CurriculumNode) -> Self {
        let id = node.id.clone();
        self.with_node_for(&id, node)
    }

    /// Answer a request for `id` with `node`, whatever id `node` carries.
    pub fn with_node_for(mut self, id: &str, node: CurriculumNode) -> Self {
        self.nodes
            .entry(id.to_string())
            .or_default()
            .push_back(Ok(node));
        self
    }

    pub fn with_node_failure(mut self, id: &str, kind: FailureKind) -> Self {
        self.nodes
            .entry(id.to_string())
            .or_default()
            .push_back(Err(RegenerationFailure::new(kind, "scripted failure")));
        self
    }

    /// Shared handle on the call log.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Proposer for ScriptedProposer {
    fn propose(
        &mut self,
        _spec: &TopicSpec,
        _context: &CurriculumContext,
    ) -> Result<Curriculum, RegenerationFailure> {
        self.log("propose".to_string());
        if let Some(next) = self.drafts.pop_front() {
            self.last_draft = Some(next);
        }
        self.last_draft.clone().unwrap_or_else(|| {
            Err(RegenerationFailure::new(
                FailureKind::Missing,
                "no draft scripted",
            ))
        })
    }

    fn regenerate_node(
        &mut self,
        node_id: &str,
        _diagnostics: &[Diagnostic],
        _context: &CurriculumContext,
    ) -> Result<CurriculumNode, RegenerationFailure> {
        self.log(format!("regenerate:{node_id}"));
        self.nodes
            .get_mut(node_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(RegenerationFailure::new(
                    FailureKind::Missing,
                    format!("no node scripted for '{node_id}'"),
                ))
            })
    }
}
