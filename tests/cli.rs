mod common;

use clap::Parser;
use lessondag::cli::{CliArgs, Command, LogLevel};
use lessondag::logging::parse_level_str;
use lessondag::stage::Stage;
use lessondag::store::{FsRunStore, RunMeta};

#[test]
fn test_parses_subcommands_and_global_flags() {
    let args = CliArgs::try_parse_from([
        "lessondag",
        "init",
        "graphs",
        "--topic-spec",
        "spec.json",
        "--log-level",
        "debug",
    ])
    .unwrap();

    assert_eq!(args.config, "Lessondag.toml");
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert_eq!(args.command.run_id(), "graphs");
    match args.command {
        Command::Init { topic_spec, .. } => assert_eq!(topic_spec.to_str(), Some("spec.json")),
        other => panic!("unexpected command {other:?}"),
    }

    let run = CliArgs::try_parse_from(["lessondag", "--config", "x.toml", "run", "r1"]).unwrap();
    assert_eq!(run.config, "x.toml");
    assert!(matches!(run.command, Command::Run { topic_spec: None, .. }));

    assert!(CliArgs::try_parse_from(["lessondag", "init", "graphs"]).is_err());
    assert!(CliArgs::try_parse_from(["lessondag", "status"]).is_err());
}

#[test]
fn test_log_level_strings() {
    assert_eq!(parse_level_str(" WARNING "), Some(tracing::Level::WARN));
    assert_eq!(parse_level_str("trace"), Some(tracing::Level::TRACE));
    assert_eq!(parse_level_str("loud"), None);
}

#[test]
fn test_run_command_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let runs_dir = dir.path().join("runs");
    let config_path = dir.path().join("Lessondag.toml");
    std::fs::write(
        &config_path,
        format!("[store]\nruns_dir = '{}'\n", runs_dir.display()),
    )
    .unwrap();
    let spec_path = dir.path().join("topic_spec.json");
    std::fs::write(
        &spec_path,
        serde_json::to_vec_pretty(&common::template_spec()).unwrap(),
    )
    .unwrap();

    let args = CliArgs::try_parse_from([
        "lessondag",
        "--config",
        config_path.to_str().unwrap(),
        "run",
        "consensus",
        "--topic-spec",
        spec_path.to_str().unwrap(),
    ])
    .unwrap();
    lessondag::run(args).unwrap();

    let store = FsRunStore::open(&runs_dir, "consensus").unwrap();
    let meta: RunMeta = lessondag::store::load_required(&store, lessondag::store::ArtifactKind::RunMetadata).unwrap();
    assert_eq!(meta.stage, Stage::Iterated);

    // A command against an unknown run fails without creating it.
    let status = CliArgs::try_parse_from([
        "lessondag",
        "--config",
        config_path.to_str().unwrap(),
        "status",
        "nobody",
    ])
    .unwrap();
    assert!(lessondag::run(status).is_err());
    assert!(!runs_dir.join("nobody").exists());
}
