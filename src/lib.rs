// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod proposal;
pub mod quality;
pub mod repair;
pub mod stage;
pub mod store;
pub mod types;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_or_default;
use crate::config::model::ConfigFile;
use crate::pipeline::Pipeline;
use crate::proposal::{CommandProposer, Proposer, TemplateProposer};
use crate::store::FsRunStore;
use crate::types::ProposerKind;

/// High-level entry point used by `main.rs`.
///
/// Loads config, opens the run store for the requested run and dispatches
/// the subcommand. Results go to stdout; logs go to stderr.
pub fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let run_id = args.command.run_id();
    let store = FsRunStore::open(&cfg.store.runs_dir, run_id)?;
    debug!(run = run_id, root = %store.root().display(), "run store opened");
    let pipeline = Pipeline::new(&store, &cfg);

    match &args.command {
        Command::Init { topic_spec, .. } => {
            let bytes = std::fs::read(topic_spec)
                .with_context(|| format!("reading topic spec {}", topic_spec.display()))?;
            let meta = pipeline.init(&bytes)?;
            println!("{run_id}: initialized (stage {})", meta.stage);
        }
        Command::Status { .. } => {
            let status = pipeline.status()?;
            println!("run:   {}", status.run_id);
            println!("stage: {}", status.stage);
            for (name, present) in &status.artifacts {
                println!("  {name:<20} {}", if *present { "present" } else { "-" });
            }
            for stale in &status.stale {
                println!("  stale: {} is older than {}", stale.artifact, stale.newer_input);
            }
        }
        Command::Generate { .. } => {
            let mut proposer = build_proposer(&cfg)?;
            let summary = pipeline.generate(proposer.as_mut())?;
            println!(
                "{run_id}: {} nodes, accepted={}, stop={}, score={}",
                summary.nodes,
                summary.accepted,
                summary.stop_reason,
                summary
                    .best_score
                    .map(|s| format!("{s:.2}"))
                    .unwrap_or_else(|| "-".to_string())
            );
        }
        Command::Validate { .. } => {
            let marker = pipeline.validate()?;
            println!("{run_id}: valid (score {:.2})", marker.composite_score);
        }
        Command::Plan { .. } => {
            let plan = pipeline.plan()?;
            println!("{run_id}: {} weeks", plan.weeks.len());
            for week in &plan.weeks {
                println!(
                    "  week {}: {:?} ({} min)",
                    week.week, week.nodes, week.allocated_minutes
                );
            }
        }
        Command::Iterate { .. } => {
            let diff = pipeline.iterate()?;
            println!(
                "{run_id}: +{} -{} ~{} ({:+} min)",
                diff.added.len(),
                diff.removed.len(),
                diff.changed.len(),
                diff.time_delta_minutes
            );
        }
        Command::Run { topic_spec, .. } => {
            let bytes = match topic_spec {
                Some(path) => Some(
                    std::fs::read(path)
                        .with_context(|| format!("reading topic spec {}", path.display()))?,
                ),
                None => None,
            };
            let mut proposer = build_proposer(&cfg)?;
            let stage = pipeline.run(bytes.as_deref(), proposer.as_mut())?;
            println!("{run_id}: stage {stage}");
        }
    }

    Ok(())
}

/// Proposal backend selected by `[proposer]`.
pub fn build_proposer(cfg: &ConfigFile) -> Result<Box<dyn Proposer>> {
    match cfg.proposer.kind {
        ProposerKind::Template => Ok(Box::new(TemplateProposer::new())),
        ProposerKind::Command => {
            let cmd = cfg
                .proposer
                .cmd
                .clone()
                .context("proposer.cmd is required when proposer.kind = \"command\"")?;
            let timeout = Duration::from_secs(cfg.policy.timeout_seconds);
            let proposer = CommandProposer::new(cmd, timeout)
                .context("starting runtime for the command proposer")?;
            Ok(Box::new(proposer))
        }
    }
}
