// src/dag/diff.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dag::graph::StructuralViolation;
use crate::dag::order::{critical_path, path_minutes};
use crate::model::{Curriculum, CurriculumNode};

pub const DIFF_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub before: Value,
    pub after: Value,
}

/// Field-level changes of one node present in both versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeChange {
    pub id: String,
    pub fields: Vec<FieldChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathComparison {
    pub before: Vec<String>,
    pub after: Vec<String>,
    pub before_minutes: f64,
    pub after_minutes: f64,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    pub schema_version: u32,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<NodeChange>,
    pub previous_total_minutes: f64,
    pub current_total_minutes: f64,
    /// `current - previous`, unrounded.
    pub time_delta_minutes: f64,
    pub critical_path: CriticalPathComparison,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && self.time_delta_minutes == 0.0
    }
}

/// Compare two curriculum versions by node id.
///
/// Both sides must be valid DAGs; a structural violation on either side
/// fails before any output is produced.
pub fn compute_diff(
    previous: &Curriculum,
    current: &Curriculum,
) -> Result<DiffReport, StructuralViolation> {
    let before_path = critical_path(previous)?;
    let after_path = critical_path(current)?;

    let prev = previous.index();
    let cur = current.index();

    let prev_ids: BTreeSet<&str> = prev.keys().copied().collect();
    let cur_ids: BTreeSet<&str> = cur.keys().copied().collect();

    let added = cur_ids.difference(&prev_ids).map(|s| s.to_string()).collect();
    let removed = prev_ids.difference(&cur_ids).map(|s| s.to_string()).collect();

    let mut changed = Vec::new();
    for id in prev_ids.intersection(&cur_ids) {
        let fields = field_changes(prev[id], cur[id]);
        if !fields.is_empty() {
            changed.push(NodeChange {
                id: id.to_string(),
                fields,
            });
        }
    }

    let previous_total_minutes = previous.total_minutes();
    let current_total_minutes = current.total_minutes();

    let before_minutes = path_minutes(previous, &before_path);
    let after_minutes = path_minutes(current, &after_path);
    let path_changed = before_path != after_path;

    Ok(DiffReport {
        schema_version: DIFF_SCHEMA_VERSION,
        added,
        removed,
        changed,
        previous_total_minutes,
        current_total_minutes,
        time_delta_minutes: current_total_minutes - previous_total_minutes,
        critical_path: CriticalPathComparison {
            before: before_path,
            after: after_path,
            before_minutes,
            after_minutes,
            changed: path_changed,
        },
    })
}

fn field_changes(before: &CurriculumNode, after: &CurriculumNode) -> Vec<FieldChange> {
    let before = as_object(before);
    let after = as_object(after);

    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let b = before.get(key).cloned().unwrap_or(Value::Null);
            let a = after.get(key).cloned().unwrap_or(Value::Null);
            (b != a).then(|| FieldChange {
                field: key.clone(),
                before: b,
                after: a,
            })
        })
        .collect()
}

fn as_object(node: &CurriculumNode) -> BTreeMap<String, Value> {
    match serde_json::to_value(node) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    }
}
