// ABOUTME: What a single strategy attempt produces: success, a redirect, or a fatal error.
// ABOUTME: Redirect is an ordinary value telling the dispatcher to try the next strategy.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::runtime::traits::{
    ClusterError, ComposeError, ContainerError, CopyError, ExecError, ImageError,
};
use crate::types::{ContainerId, ImageRef, TargetName, WorkloadRef};

/// The closed set of update strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    ContainerPatch,
    ImageBuild,
    ComposeBuild,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::ContainerPatch => write!(f, "container-patch"),
            StrategyKind::ImageBuild => write!(f, "image-build"),
            StrategyKind::ComposeBuild => write!(f, "compose-build"),
        }
    }
}

/// What a successful update left running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum Deployed {
    Container(ContainerId),
    Image(ImageRef),
    ComposeService(String),
}

/// One applied sync step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncRecord {
    pub local: PathBuf,
    pub remote: String,
}

/// Details of a successful update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutcome {
    pub strategy: StrategyKind,
    pub target: TargetName,
    pub deployed: Deployed,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub synced: Vec<SyncRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    pub restarted: bool,
    /// True when an existing image matched the cache key and no build ran.
    pub cache_hit: bool,
}

impl BuildOutcome {
    pub fn new(strategy: StrategyKind, target: TargetName, deployed: Deployed) -> Self {
        Self {
            strategy,
            target,
            deployed,
            synced: Vec::new(),
            commands: Vec::new(),
            restarted: false,
            cache_hit: false,
        }
    }
}

/// Why a strategy declined a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RedirectReason {
    /// The strategy's applicability check said no.
    NotApplicable { detail: String },
    /// A fall-back step matched a changed file.
    FallBackTriggered { file: PathBuf },
    /// No running container could be found for the workload.
    ContainerNotFound { workload: WorkloadRef },
    /// The runtime could not be asked about the workload.
    ContainerUnreachable { detail: String },
    /// A changed file lies outside every sync step, so patching would leave it behind.
    ChangesNotSynced { file: PathBuf },
}

impl RedirectReason {
    pub fn not_applicable(detail: impl Into<String>) -> Self {
        RedirectReason::NotApplicable {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectReason::NotApplicable { detail } => write!(f, "not applicable: {}", detail),
            RedirectReason::FallBackTriggered { file } => {
                write!(f, "fall_back_on matched {}", file.display())
            }
            RedirectReason::ContainerNotFound { workload } => {
                write!(f, "no running container for {}", workload)
            }
            RedirectReason::ContainerUnreachable { detail } => {
                write!(f, "container runtime unreachable: {}", detail)
            }
            RedirectReason::ChangesNotSynced { file } => {
                write!(f, "{} is not covered by any sync step", file.display())
            }
        }
    }
}

/// Failures that end a dispatch without trying another strategy.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("sync {local} -> {remote} in container {container} failed: {source}")]
    Sync {
        local: PathBuf,
        remote: String,
        container: String,
        #[source]
        source: CopyError,
    },

    #[error("run `{command}` in container {container} failed: {source}")]
    Exec {
        command: String,
        container: String,
        #[source]
        source: ExecError,
    },

    #[error("run `{command}` in container {container} exited with code {exit_code}: {output}")]
    CommandFailed {
        command: String,
        container: String,
        exit_code: i64,
        output: String,
    },

    #[error("restart of container {container} failed: {source}")]
    Restart {
        container: String,
        #[source]
        source: ContainerError,
    },

    #[error("reading build context {} failed: {source}", .context.display())]
    Context {
        context: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image build failed: {0}")]
    Image(#[from] ImageError),

    #[error("deploy of {image} failed: {source}")]
    Deploy {
        image: String,
        #[source]
        source: ClusterError,
    },

    #[error("compose build of service {service} failed: {source}")]
    Compose {
        service: String,
        #[source]
        source: ComposeError,
    },

    /// The cancellation token fired; `after` names the last step that completed, if any.
    #[error("cancelled{}", .after.as_ref().map(|s| format!(" after {}", s)).unwrap_or_default())]
    Cancelled { after: Option<String> },
}

impl BuildError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled { .. })
    }
}

/// Outcome of one strategy attempt.
#[derive(Debug)]
pub enum BuildResult {
    Success(BuildOutcome),
    Redirect(RedirectReason),
    Fatal(BuildError),
}
