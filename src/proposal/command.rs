// src/proposal/command.rs

use std::process::Stdio;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::model::{
    Curriculum, CurriculumContext, CurriculumNode, TopicSpec, CURRICULUM_SCHEMA_VERSION,
};
use crate::proposal::{FailureKind, Proposer, RegenerationFailure};
use crate::quality::Diagnostic;

/// JSON written to the collaborator's stdin.
#[derive(Debug, Serialize)]
#[serde(tag = "request", rename_all = "snake_case")]
enum Request<'a> {
    Propose {
        topic_spec: &'a TopicSpec,
        context: &'a CurriculumContext,
    },
    RegenerateNode {
        node_id: &'a str,
        diagnostics: &'a [Diagnostic],
        context: &'a CurriculumContext,
    },
}

/// Proposer backed by an external shell command.
///
/// Each request spawns the command once, writes one JSON request on stdin
/// and reads one JSON document from stdout. The call blocks on a private
/// current-thread runtime; the child is killed when the timeout expires.
pub struct CommandProposer {
    cmd: String,
    timeout: Duration,
    runtime: Runtime,
}

impl CommandProposer {
    pub fn new(cmd: impl Into<String>, timeout: Duration) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            cmd: cmd.into(),
            timeout,
            runtime,
        })
    }

    fn call<T: DeserializeOwned>(&self, request: &Request<'_>) -> Result<T, RegenerationFailure> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| RegenerationFailure::new(FailureKind::Malformed, e.to_string()))?;

        let stdout = self.runtime.block_on(async {
            match tokio::time::timeout(self.timeout, run_command(&self.cmd, &payload)).await {
                Ok(result) => result,
                Err(_) => Err(RegenerationFailure::new(
                    FailureKind::Timeout,
                    format!("no response within {}s", self.timeout.as_secs()),
                )),
            }
        })?;

        if stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(RegenerationFailure::new(
                FailureKind::Missing,
                "empty stdout",
            ));
        }

        serde_json::from_slice(&stdout)
            .map_err(|e| RegenerationFailure::new(FailureKind::Malformed, e.to_string()))
    }
}

async fn run_command(cmd_line: &str, payload: &[u8]) -> Result<Vec<u8>, RegenerationFailure> {
    info!(cmd = %cmd_line, "starting proposal process");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd_line);
        c
    };

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| RegenerationFailure::new(FailureKind::Spawn, e.to_string()))?;

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(payload).await {
            // The collaborator may exit without reading; its exit status decides.
            debug!(error = %e, "writing proposal request failed");
        }
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| RegenerationFailure::new(FailureKind::Spawn, e.to_string()))?;

    for line in String::from_utf8_lossy(&output.stderr).lines() {
        debug!("proposal stderr: {}", line);
    }

    let code = output.status.code().unwrap_or(-1);
    info!(exit_code = code, success = output.status.success(), "proposal process exited");

    if !output.status.success() {
        return Err(RegenerationFailure::new(
            FailureKind::Rejected,
            format!("exit code {code}"),
        ));
    }

    Ok(output.stdout)
}

impl Proposer for CommandProposer {
    fn propose(
        &mut self,
        spec: &TopicSpec,
        context: &CurriculumContext,
    ) -> Result<Curriculum, RegenerationFailure> {
        let curriculum: Curriculum = self.call(&Request::Propose {
            topic_spec: spec,
            context,
        })?;

        if curriculum.schema_version != CURRICULUM_SCHEMA_VERSION {
            warn!(
                got = curriculum.schema_version,
                "proposal returned an unsupported schema version"
            );
            return Err(RegenerationFailure::new(
                FailureKind::Malformed,
                format!(
                    "schema_version {} (expected {CURRICULUM_SCHEMA_VERSION})",
                    curriculum.schema_version
                ),
            ));
        }
        Ok(curriculum)
    }

    fn regenerate_node(
        &mut self,
        node_id: &str,
        diagnostics: &[Diagnostic],
        context: &CurriculumContext,
    ) -> Result<CurriculumNode, RegenerationFailure> {
        let node: CurriculumNode = self.call(&Request::RegenerateNode {
            node_id,
            diagnostics,
            context,
        })?;

        if node.id != node_id {
            return Err(RegenerationFailure::new(
                FailureKind::Malformed,
                format!("asked for node '{node_id}', got '{}'", node.id),
            ));
        }
        Ok(node)
    }
}
