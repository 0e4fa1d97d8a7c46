use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a diagnostic gates acceptance.
///
/// - `HardFail`: blocks acceptance regardless of score.
/// - `Advisory`: lowers the score but never blocks on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    HardFail,
    Advisory,
}

impl Severity {
    /// Higher ranks are repaired first.
    pub fn rank(self) -> u8 {
        match self {
            Severity::HardFail => 2,
            Severity::Advisory => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::HardFail => "hard_fail",
            Severity::Advisory => "advisory",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested curriculum depth from the topic spec constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Survey,
    Practical,
    Mastery,
}

impl Default for Depth {
    fn default() -> Self {
        Depth::Practical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainMode {
    Mature,
    Frontier,
}

impl Default for DomainMode {
    fn default() -> Self {
        DomainMode::Mature
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceMode {
    Minimal,
    Standard,
    Strict,
}

impl Default for EvidenceMode {
    fn default() -> Self {
        EvidenceMode::Minimal
    }
}

/// Which proposal collaborator backs the optimization loop.
///
/// - `Template`: built-in deterministic proposer (default).
/// - `Command`: external process speaking JSON over stdin/stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposerKind {
    Template,
    Command,
}

impl Default for ProposerKind {
    fn default() -> Self {
        ProposerKind::Template
    }
}

impl FromStr for ProposerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "template" => Ok(ProposerKind::Template),
            "command" => Ok(ProposerKind::Command),
            other => Err(format!(
                "invalid proposer kind: {other} (expected \"template\" or \"command\")"
            )),
        }
    }
}
