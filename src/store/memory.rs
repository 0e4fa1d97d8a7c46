// src/store/memory.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use crate::errors::Result;
use crate::store::{ArtifactKind, RunEvent, RunStore};

#[derive(Debug, Default)]
struct Inner {
    clock: u64,
    artifacts: HashMap<ArtifactKind, (Vec<u8>, u64)>,
    events: Vec<RunEvent>,
}

/// In-memory run store.
///
/// Every write advances a logical clock by one second, so a later write is
/// always strictly newer. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRunStore {
    run_id: String,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRunStore {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-stamp an existing artifact with the next clock tick.
    pub fn touch(&self, kind: ArtifactKind) {
        let mut inner = self.lock();
        inner.clock += 1;
        let now = inner.clock;
        if let Some(entry) = inner.artifacts.get_mut(&kind) {
            entry.1 = now;
        }
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.lock().events.clone()
    }
}

fn at(tick: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(tick)
}

impl RunStore for MemoryRunStore {
    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn read_artifact(&self, kind: ArtifactKind) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().artifacts.get(&kind).map(|(bytes, _)| bytes.clone()))
    }

    fn write_artifact(&self, kind: ArtifactKind, bytes: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        inner.clock += 1;
        let now = inner.clock;
        inner.artifacts.insert(kind, (bytes.to_vec(), now));
        Ok(())
    }

    fn artifact_mtime(&self, kind: ArtifactKind) -> Option<SystemTime> {
        self.lock().artifacts.get(&kind).map(|(_, tick)| at(*tick))
    }

    fn append_event(&self, event: &RunEvent) -> Result<()> {
        self.lock().events.push(event.clone());
        Ok(())
    }
}
