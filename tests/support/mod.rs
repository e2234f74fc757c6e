// ABOUTME: Test support utilities.
// ABOUTME: In-memory fakes for the runtime, builder, cluster and compose collaborators.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use async_trait::async_trait;
use hotpatch::build::{
    BuildAndDeployer, BuildError, BuildOutcome, BuildResult, BuildTarget, Deployed,
    RedirectReason, StrategyKind,
};
use hotpatch::liveupdate::{DeclarationPos, DeclarationSession, LiveUpdate, StepSpec};
use hotpatch::runtime::traits::{
    BuildContext, CacheKey, ClusterClient, ClusterError, ComposeClient, ComposeError,
    ContainerError, ContainerOps, CopyError, CopyOps, ExecError, ExecOps, ExecResult,
    ImageBuilder, ImageError,
};
use hotpatch::types::{ChangeSet, ContainerId, ImageRef, ShellCommand, TargetName, WorkloadRef};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("hotpatch=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Shared, ordered record of collaborator calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

#[allow(dead_code)]
impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Calls whose name starts with `prefix`.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[allow(dead_code)]
pub fn target_name(name: &str) -> TargetName {
    TargetName::new(name).unwrap()
}

/// A target with a live update built from `specs`, rooted at `/project`.
#[allow(dead_code)]
pub fn live_target(name: &str, specs: Vec<StepSpec>) -> BuildTarget {
    BuildTarget::new(
        target_name(name),
        WorkloadRef::new("deployment", name),
        "/project",
    )
    .with_live_update(live_update("/project", specs))
}

#[allow(dead_code)]
pub fn live_update(base_dir: &str, specs: Vec<StepSpec>) -> LiveUpdate {
    let mut session = DeclarationSession::new(base_dir);
    let steps: Vec<_> = specs
        .into_iter()
        .enumerate()
        .map(|(i, spec)| session.declare(spec, DeclarationPos::new("test", i.to_string())))
        .collect();
    let live_update = session.convert(&steps).unwrap();
    session.validate_all_consumed().unwrap();
    live_update
}

#[allow(dead_code)]
pub fn sync(local: &str, remote: &str) -> StepSpec {
    StepSpec::Sync {
        local: PathBuf::from(local),
        remote: remote.to_string(),
    }
}

#[allow(dead_code)]
pub fn run(cmd: &str, triggers: &[&str]) -> StepSpec {
    StepSpec::Run {
        cmd: cmd.to_string(),
        trigger: triggers.iter().map(|t| t.to_string()).collect(),
    }
}

/// Container runtime that records every call instead of touching a daemon.
#[derive(Debug, Clone)]
pub struct FakeRuntime {
    pub log: CallLog,
    pub container: Option<ContainerId>,
    pub exit_code: i64,
    pub fail_copy: bool,
    pub unreachable: bool,
}

#[allow(dead_code)]
impl FakeRuntime {
    pub fn with_container(id: &str) -> Self {
        Self {
            log: CallLog::default(),
            container: Some(ContainerId::new(id)),
            exit_code: 0,
            fail_copy: false,
            unreachable: false,
        }
    }

    pub fn without_container() -> Self {
        Self {
            container: None,
            ..Self::with_container("unused")
        }
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn find_running_container(
        &self,
        workload: &WorkloadRef,
    ) -> Result<Option<ContainerId>, ContainerError> {
        self.log.push(format!("find {}", workload));
        if self.unreachable {
            return Err(ContainerError::Runtime("socket closed".to_string()));
        }
        Ok(self.container.clone())
    }

    async fn restart_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.log.push(format!("restart {}", id));
        Ok(())
    }
}

#[async_trait]
impl CopyOps for FakeRuntime {
    async fn copy_to_container(
        &self,
        id: &ContainerId,
        local: &Path,
        remote: &str,
    ) -> Result<(), CopyError> {
        self.log
            .push(format!("copy {} {} {}", id, local.display(), remote));
        if self.fail_copy {
            return Err(CopyError::Runtime("disk full".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ExecOps for FakeRuntime {
    async fn exec_in_container(
        &self,
        id: &ContainerId,
        command: &ShellCommand,
    ) -> Result<ExecResult, ExecError> {
        self.log.push(format!("exec {} {}", id, command.script()));
        Ok(ExecResult {
            exit_code: self.exit_code,
            stdout: Vec::new(),
            stderr: if self.exit_code == 0 {
                Vec::new()
            } else {
                b"command failed".to_vec()
            },
        })
    }
}

/// Image builder that hands back the requested tag.
#[derive(Debug, Clone, Default)]
pub struct FakeBuilder {
    pub log: CallLog,
    pub cached: Option<ImageRef>,
    pub fail_build: bool,
}

#[async_trait]
impl ImageBuilder for FakeBuilder {
    async fn build(&self, context: &BuildContext, tag: &ImageRef) -> Result<ImageRef, ImageError> {
        self.log
            .push(format!("build {} {}", context.context_dir.display(), tag));
        if self.fail_build {
            return Err(ImageError::BuildFailed {
                image: tag.to_string(),
                message: "RUN npm ci returned 1".to_string(),
            });
        }
        Ok(tag.clone())
    }

    async fn cache_lookup(&self, key: &CacheKey) -> Result<Option<ImageRef>, ImageError> {
        self.log.push(format!("cache_lookup {}", key.image()));
        Ok(self.cached.clone())
    }

    async fn push(&self, image: &ImageRef) -> Result<(), ImageError> {
        self.log.push(format!("push {}", image));
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeCluster {
    pub log: CallLog,
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn update_workload_image(
        &self,
        workload: &WorkloadRef,
        image: &ImageRef,
    ) -> Result<(), ClusterError> {
        self.log.push(format!("set_image {} {}", workload, image));
        Ok(())
    }

    async fn apply_and_wait(&self, manifest: &Path) -> Result<(), ClusterError> {
        self.log.push(format!("apply {}", manifest.display()));
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeCompose {
    pub log: CallLog,
}

#[async_trait]
impl ComposeClient for FakeCompose {
    async fn build_and_up(&self, service: &str, context: &Path) -> Result<(), ComposeError> {
        self.log
            .push(format!("compose_up {} {}", service, context.display()));
        Ok(())
    }
}

/// What a [`ScriptedStrategy`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Script {
    Succeed,
    Redirect,
    Fail,
    /// Cancel the token mid-run, then report the cancellation.
    CancelMidway,
    /// Cancel the token, then decline as if nothing happened.
    CancelAndRedirect,
}

/// Strategy with a fixed result, logging each invocation to a shared log.
#[derive(Debug)]
pub struct ScriptedStrategy {
    kind: StrategyKind,
    script: Script,
    applicable: bool,
    log: CallLog,
}

#[allow(dead_code)]
impl ScriptedStrategy {
    pub fn new(kind: StrategyKind, script: Script, log: &CallLog) -> Self {
        Self {
            kind,
            script,
            applicable: true,
            log: log.clone(),
        }
    }

    pub fn not_applicable(mut self) -> Self {
        self.applicable = false;
        self
    }

    pub fn shared(self) -> Arc<dyn BuildAndDeployer> {
        Arc::new(self)
    }
}

#[async_trait]
impl BuildAndDeployer for ScriptedStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn can_apply(&self, _target: &BuildTarget, _changes: &ChangeSet) -> bool {
        self.applicable
    }

    async fn build_and_deploy(
        &self,
        cancel: &CancellationToken,
        target: &BuildTarget,
        _changes: &ChangeSet,
    ) -> BuildResult {
        self.log.push(self.kind.to_string());
        match self.script {
            Script::Succeed => BuildResult::Success(BuildOutcome::new(
                self.kind,
                target.name.clone(),
                Deployed::ComposeService(target.name.to_string()),
            )),
            Script::Redirect => {
                BuildResult::Redirect(RedirectReason::not_applicable(format!("{} says no", self.kind)))
            }
            Script::Fail => BuildResult::Fatal(BuildError::Compose {
                service: target.name.to_string(),
                source: ComposeError::ComposeFileNotFound("/missing.yml".to_string()),
            }),
            Script::CancelMidway => {
                cancel.cancel();
                BuildResult::Fatal(BuildError::Cancelled { after: None })
            }
            Script::CancelAndRedirect => {
                cancel.cancel();
                BuildResult::Redirect(RedirectReason::ChangesNotSynced {
                    file: PathBuf::from("/project/README.md"),
                })
            }
        }
    }
}
