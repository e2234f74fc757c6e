// ABOUTME: Declared live-update steps, before validation into the executable model.
// ABOUTME: StepSpec is the serde form; LiveUpdateStep pairs it with its declaration site.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::position::DeclarationPos;

/// What a step does, as written in configuration.
///
/// This is also the description a validated [`LiveUpdate`](super::LiveUpdate)
/// renders back out, so a step list survives conversion unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSpec {
    /// Abandon the live update and rebuild if any of these paths changed.
    FallBackOn(#[serde(deserialize_with = "one_or_many")] Vec<String>),

    /// Copy a local file or directory into the container.
    Sync { local: PathBuf, remote: String },

    /// Run a command in the container; only when a trigger matched, if any are set.
    Run {
        cmd: String,
        #[serde(
            default,
            deserialize_with = "one_or_many",
            skip_serializing_if = "Vec::is_empty"
        )]
        trigger: Vec<String>,
    },

    /// Restart the container's main process once syncs and runs are done.
    RestartContainer,
}

impl StepSpec {
    pub fn type_name(&self) -> &'static str {
        match self {
            StepSpec::FallBackOn(_) => "live_update_fall_back_on_step",
            StepSpec::Sync { .. } => "live_update_sync_step",
            StepSpec::Run { .. } => "live_update_run_step",
            StepSpec::RestartContainer => "live_update_restart_container_step",
        }
    }
}

impl fmt::Display for StepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepSpec::FallBackOn(files) => write!(f, "fall_back_on step: {:?}", files),
            StepSpec::Sync { local, remote } => {
                write!(f, "sync step: '{}'->'{}'", local.display(), remote)
            }
            StepSpec::Run { cmd, trigger } => {
                write!(f, "run step: {:?}", cmd)?;
                if !trigger.is_empty() {
                    write!(f, " (triggers: {})", trigger.join("; "))?;
                }
                Ok(())
            }
            StepSpec::RestartContainer => write!(f, "restart_container step"),
        }
    }
}

/// A step value that has been declared but not necessarily used yet.
///
/// Created through [`DeclarationSession`](super::DeclarationSession), which
/// records it until a live update consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveUpdateStep {
    spec: StepSpec,
    position: DeclarationPos,
}

impl LiveUpdateStep {
    pub(crate) fn new(spec: StepSpec, position: DeclarationPos) -> Self {
        Self { spec, position }
    }

    pub fn spec(&self) -> &StepSpec {
        &self.spec
    }

    pub fn position(&self) -> &DeclarationPos {
        &self.position
    }
}

impl fmt::Display for LiveUpdateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec)
    }
}

/// Accepts either a single string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}
