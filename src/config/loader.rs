// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;
use crate::types::ProposerKind;

pub const RUNS_DIR_ENV: &str = "LESSONDAG_RUNS_DIR";
pub const PROPOSER_ENV: &str = "LESSONDAG_PROPOSER";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** check ranges.
/// Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path, apply environment overrides and
/// validate.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let mut raw_config = load_from_path(&path)?;
    apply_env_overrides(&mut raw_config);
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file yields the defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if path.exists() {
        return load_and_validate(path);
    }
    debug!(path = %path.display(), "config file not found, using defaults");
    let mut raw_config = RawConfigFile::default();
    apply_env_overrides(&mut raw_config);
    ConfigFile::try_from(raw_config)
}

fn apply_env_overrides(raw: &mut RawConfigFile) {
    if let Ok(dir) = std::env::var(RUNS_DIR_ENV) {
        if !dir.trim().is_empty() {
            raw.store.runs_dir = PathBuf::from(dir);
        }
    }

    if let Ok(kind) = std::env::var(PROPOSER_ENV) {
        match kind.parse::<ProposerKind>() {
            Ok(k) => raw.proposer.kind = k,
            Err(e) => warn!(error = %e, "ignoring {PROPOSER_ENV}"),
        }
    }
}
