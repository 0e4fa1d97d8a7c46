use std::io::Write;
use std::path::PathBuf;

use lessondag::config::{load_and_validate, load_from_path, load_or_default, ConfigFile};
use lessondag::errors::CompilerError;
use lessondag::types::ProposerKind;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn config_error(contents: &str) -> String {
    let file = write_config(contents);
    match load_and_validate(file.path()) {
        Err(CompilerError::Config(message)) => message,
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_empty_file_yields_defaults() {
    let file = write_config("");
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.policy.max_iterations, 4);
    assert_eq!(cfg.policy.max_actions_per_iteration, 4);
    assert_eq!(cfg.policy.target_score, 82.0);
    assert_eq!(cfg.policy.min_pedagogy_score, 72.0);
    assert_eq!(cfg.policy.plateau_window, 2);
    assert_eq!(cfg.policy.retry_budget, 2);
    assert_eq!(cfg.planner.min_weeks, 2);
    assert_eq!(cfg.planner.max_weeks, 4);
    assert_eq!(cfg.proposer.kind, ProposerKind::Template);
}

#[test]
fn test_sections_override_defaults() {
    let file = write_config(
        r#"
[policy]
max_iterations = 6
target_score = 90.0
retry_budget = 0

[planner]
min_weeks = 1
max_weeks = 8

[proposer]
kind = "command"
cmd = "python3 propose.py"

[store]
runs_dir = "out/runs"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.policy.max_iterations, 6);
    assert_eq!(cfg.policy.target_score, 90.0);
    assert_eq!(cfg.policy.retry_budget, 0);
    assert_eq!(cfg.policy.plateau_window, 2);
    assert_eq!(cfg.planner.max_weeks, 8);
    assert_eq!(cfg.proposer.kind, ProposerKind::Command);
    assert_eq!(cfg.proposer.cmd.as_deref(), Some("python3 propose.py"));
    assert_eq!(cfg.store.runs_dir, PathBuf::from("out/runs"));
}

#[test]
fn test_range_checks() {
    assert!(config_error("[policy]\nmax_iterations = 0\n").contains("max_iterations"));
    assert!(config_error("[policy]\ntarget_score = 120.0\n").contains("target_score"));
    assert!(config_error("[planner]\nmin_weeks = 5\nmax_weeks = 3\n").contains("max_weeks (3)"));
    assert!(config_error("[planner]\nmin_weeks = 0\n").contains("min_weeks"));
}

#[test]
fn test_command_proposer_requires_a_command() {
    let message = config_error("[proposer]\nkind = \"command\"\n");
    assert!(message.contains("[proposer].cmd"), "{message}");

    let blank = config_error("[proposer]\nkind = \"command\"\ncmd = \"  \"\n");
    assert!(blank.contains("[proposer].cmd"), "{blank}");
}

#[test]
fn test_malformed_toml_is_reported() {
    let file = write_config("[policy\nmax_iterations = ");
    assert!(matches!(load_from_path(file.path()), Err(CompilerError::Toml(_))));

    let unknown_kind = write_config("[proposer]\nkind = \"oracle\"\n");
    assert!(matches!(load_from_path(unknown_kind.path()), Err(CompilerError::Toml(_))));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Lessondag.toml");

    assert!(matches!(load_and_validate(&path), Err(CompilerError::Io(_))));
    let cfg = load_or_default(&path).unwrap();
    assert_eq!(cfg.policy.max_iterations, ConfigFile::default().policy.max_iterations);
}
