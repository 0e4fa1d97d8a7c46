// src/store/meta.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::Stage;

pub const RUN_META_SCHEMA_VERSION: u32 = 1;
pub const VALIDATION_SCHEMA_VERSION: u32 = 1;

/// `run.json`: the cached stage plus its transition history.
///
/// `stage` is a cache of the stage inference; it is overwritten whenever
/// the artifacts say otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub run_id: String,
    pub created_at_utc: DateTime<Utc>,
    pub stage: Stage,
    #[serde(default)]
    pub history: Vec<RunEvent>,
}

impl RunMeta {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            schema_version: RUN_META_SCHEMA_VERSION,
            run_id: run_id.into(),
            created_at_utc: Utc::now(),
            stage: Stage::Initialized,
            history: Vec::new(),
        }
    }
}

/// One line of `logs/events.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub at_utc: DateTime<Utc>,
    pub event_type: String,
    pub stage: Stage,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RunEvent {
    pub fn new(event_type: impl Into<String>, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            at_utc: Utc::now(),
            event_type: event_type.into(),
            stage,
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Contents of the validation marker: which curriculum passed, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMarker {
    pub schema_version: u32,
    pub curriculum_hash: String,
    pub composite_score: f64,
}

impl ValidationMarker {
    pub fn new(curriculum_hash: String, composite_score: f64) -> Self {
        Self {
            schema_version: VALIDATION_SCHEMA_VERSION,
            curriculum_hash,
            composite_score,
        }
    }
}
