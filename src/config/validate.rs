// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CompilerError, Result};
use crate::types::ProposerKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CompilerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_policy(cfg)?;
    validate_planner(cfg)?;
    validate_proposer(cfg)?;
    Ok(())
}

fn validate_policy(cfg: &RawConfigFile) -> Result<()> {
    let p = &cfg.policy;

    for (name, value) in [
        ("max_iterations", p.max_iterations as u64),
        ("max_actions_per_iteration", p.max_actions_per_iteration as u64),
        ("plateau_window", p.plateau_window as u64),
        ("timeout_seconds", p.timeout_seconds),
    ] {
        if value == 0 {
            return Err(CompilerError::Config(format!(
                "[policy].{name} must be >= 1 (got 0)"
            )));
        }
    }

    for (name, value) in [
        ("target_score", p.target_score),
        ("min_pedagogy_score", p.min_pedagogy_score),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(CompilerError::Config(format!(
                "[policy].{name} must be within 0..=100 (got {value})"
            )));
        }
    }

    Ok(())
}

fn validate_planner(cfg: &RawConfigFile) -> Result<()> {
    let p = &cfg.planner;
    if p.min_weeks == 0 {
        return Err(CompilerError::Config(
            "[planner].min_weeks must be >= 1 (got 0)".to_string(),
        ));
    }
    if p.max_weeks < p.min_weeks {
        return Err(CompilerError::Config(format!(
            "[planner].max_weeks ({}) must be >= min_weeks ({})",
            p.max_weeks, p.min_weeks
        )));
    }
    Ok(())
}

fn validate_proposer(cfg: &RawConfigFile) -> Result<()> {
    if cfg.proposer.kind == ProposerKind::Command {
        let has_cmd = cfg
            .proposer
            .cmd
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        if !has_cmd {
            return Err(CompilerError::Config(
                "[proposer].cmd is required when kind = \"command\"".to_string(),
            ));
        }
    }
    Ok(())
}
