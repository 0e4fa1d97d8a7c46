// src/store/fs.rs

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::errors::Result;
use crate::store::{validate_run_id, ArtifactKind, RunEvent, RunStore};

const EVENTS_PATH: &str = "logs/events.jsonl";

/// Run store rooted at `<runs_dir>/<run_id>/`.
#[derive(Debug, Clone)]
pub struct FsRunStore {
    run_id: String,
    root: PathBuf,
}

impl FsRunStore {
    /// Fails when `run_id` is not a plain slug, so paths cannot escape
    /// `runs_dir`. Nothing is created on disk until the first write.
    pub fn open(runs_dir: impl AsRef<Path>, run_id: &str) -> Result<Self> {
        validate_run_id(run_id)?;
        Ok(Self {
            run_id: run_id.to_string(),
            root: runs_dir.as_ref().join(run_id),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.relative_path())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

impl RunStore for FsRunStore {
    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn read_artifact(&self, kind: ArtifactKind) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_of(kind)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_artifact(&self, kind: ArtifactKind, bytes: &[u8]) -> Result<()> {
        let path = self.path_of(kind);
        ensure_parent(&path)?;
        // Write-then-rename so readers never see half a document.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn artifact_mtime(&self, kind: ArtifactKind) -> Option<SystemTime> {
        fs::metadata(self.path_of(kind))
            .and_then(|m| m.modified())
            .ok()
    }

    fn append_event(&self, event: &RunEvent) -> Result<()> {
        let path = self.root.join(EVENTS_PATH);
        ensure_parent(&path)?;
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        file.write_all(&line)?;
        Ok(())
    }
}
