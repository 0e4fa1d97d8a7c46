// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `lessondag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "lessondag",
    version,
    about = "Compile a topic spec into a scored, scheduled curriculum DAG.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Lessondag.toml` in the current working directory. A missing
    /// file means all defaults.
    #[arg(long, value_name = "PATH", default_value = "Lessondag.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LESSONDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create a run from a topic spec.
    Init {
        run_id: String,
        #[arg(long, value_name = "PATH")]
        topic_spec: PathBuf,
    },
    /// Print the inferred stage and artifact state.
    Status { run_id: String },
    /// Run the optimization loop and write the curriculum.
    Generate { run_id: String },
    /// Check the curriculum and write the validation marker.
    Validate { run_id: String },
    /// Build the weekly plan.
    Plan { run_id: String },
    /// Diff against the previous curriculum.
    Iterate { run_id: String },
    /// Every step in order; `--topic-spec` initializes the run first.
    Run {
        run_id: String,
        #[arg(long, value_name = "PATH")]
        topic_spec: Option<PathBuf>,
    },
}

impl Command {
    pub fn run_id(&self) -> &str {
        match self {
            Command::Init { run_id, .. }
            | Command::Status { run_id }
            | Command::Generate { run_id }
            | Command::Validate { run_id }
            | Command::Plan { run_id }
            | Command::Iterate { run_id }
            | Command::Run { run_id, .. } => run_id,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
