// ABOUTME: Live-update strategy: patch the running container instead of rebuilding.
// ABOUTME: Syncs covered paths, runs triggered commands, then restarts if asked.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::result::{
    BuildError, BuildOutcome, BuildResult, Deployed, RedirectReason, StrategyKind, SyncRecord,
};
use super::strategy::BuildAndDeployer;
use super::target::BuildTarget;
use crate::liveupdate::{LiveUpdate, SyncStep};
use crate::runtime::traits::ContainerRuntime;
use crate::types::{ChangeSet, ContainerId};

pub struct ContainerPatchStrategy {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerPatchStrategy {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }
}

/// Relative change paths are taken relative to the live update's base directory.
fn anchor_changes(changes: &ChangeSet, base_dir: &Path) -> ChangeSet {
    changes
        .iter()
        .map(|p| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            }
        })
        .collect()
}

fn covering_syncs<'a>(live_update: &'a LiveUpdate, changes: &ChangeSet) -> Vec<&'a SyncStep> {
    live_update
        .sync_steps()
        .filter(|sync| changes.iter().any(|path| sync.covers(path)))
        .collect()
}

fn check_cancel(cancel: &CancellationToken, after: Option<&str>) -> Result<(), BuildError> {
    if cancel.is_cancelled() {
        return Err(BuildError::Cancelled {
            after: after.map(str::to_string),
        });
    }
    Ok(())
}

impl ContainerPatchStrategy {
    /// The side-effecting half: only reached once every redirect check passed.
    async fn patch(
        &self,
        cancel: &CancellationToken,
        target: &BuildTarget,
        live_update: &LiveUpdate,
        syncs: &[&SyncStep],
        changes: &ChangeSet,
        container: ContainerId,
    ) -> Result<BuildOutcome, BuildError> {
        let mut outcome = BuildOutcome::new(
            StrategyKind::ContainerPatch,
            target.name.clone(),
            Deployed::Container(container.clone()),
        );
        let mut last_step: Option<String> = None;

        for sync in syncs {
            check_cancel(cancel, last_step.as_deref())?;
            tracing::debug!(
                container = container.short(),
                local = %sync.source.display(),
                remote = %sync.dest,
                "syncing"
            );
            self.runtime
                .copy_to_container(&container, &sync.source, &sync.dest)
                .await
                .map_err(|source| BuildError::Sync {
                    local: sync.source.clone(),
                    remote: sync.dest.clone(),
                    container: container.short().to_string(),
                    source,
                })?;
            outcome.synced.push(SyncRecord {
                local: sync.source.clone(),
                remote: sync.dest.clone(),
            });
            last_step = Some(format!("sync {} -> {}", sync.source.display(), sync.dest));
        }

        for run in live_update.run_steps().filter(|run| run.should_run(changes)) {
            check_cancel(cancel, last_step.as_deref())?;
            let script = run.command.script().to_string();
            tracing::debug!(container = container.short(), command = %script, "running");
            let result = self
                .runtime
                .exec_in_container(&container, &run.command)
                .await
                .map_err(|source| BuildError::Exec {
                    command: script.clone(),
                    container: container.short().to_string(),
                    source,
                })?;
            if !result.success() {
                return Err(BuildError::CommandFailed {
                    command: script,
                    container: container.short().to_string(),
                    exit_code: result.exit_code,
                    output: result.diagnostic(),
                });
            }
            last_step = Some(format!("run `{}`", script));
            outcome.commands.push(script);
        }

        if live_update.should_restart() {
            check_cancel(cancel, last_step.as_deref())?;
            tracing::debug!(container = container.short(), "restarting container");
            self.runtime
                .restart_container(&container)
                .await
                .map_err(|source| BuildError::Restart {
                    container: container.short().to_string(),
                    source,
                })?;
            outcome.restarted = true;
        }

        Ok(outcome)
    }
}

#[async_trait]
impl BuildAndDeployer for ContainerPatchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ContainerPatch
    }

    fn can_apply(&self, target: &BuildTarget, changes: &ChangeSet) -> bool {
        match target.live_update {
            Some(ref live_update) => {
                let changes = anchor_changes(changes, live_update.base_dir());
                live_update.fall_back_trigger(&changes).is_none()
            }
            None => false,
        }
    }

    async fn build_and_deploy(
        &self,
        cancel: &CancellationToken,
        target: &BuildTarget,
        changes: &ChangeSet,
    ) -> BuildResult {
        let Some(ref live_update) = target.live_update else {
            return BuildResult::Redirect(RedirectReason::not_applicable(
                "target has no live_update",
            ));
        };

        // Every fall-back condition is checked before anything touches the container.
        let changes = anchor_changes(changes, live_update.base_dir());
        if let Some(file) = live_update.fall_back_trigger(&changes) {
            return BuildResult::Redirect(RedirectReason::FallBackTriggered {
                file: file.to_path_buf(),
            });
        }

        if let Some(file) = live_update.unsynced_change(&changes) {
            return BuildResult::Redirect(RedirectReason::ChangesNotSynced {
                file: file.to_path_buf(),
            });
        }
        let syncs = covering_syncs(live_update, &changes);
        if syncs.is_empty() {
            return BuildResult::Redirect(RedirectReason::not_applicable("no changed files"));
        }

        let container = match self.runtime.find_running_container(&target.workload).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                return BuildResult::Redirect(RedirectReason::ContainerNotFound {
                    workload: target.workload.clone(),
                });
            }
            Err(e) => {
                return BuildResult::Redirect(RedirectReason::ContainerUnreachable {
                    detail: e.to_string(),
                });
            }
        };

        match self
            .patch(cancel, target, live_update, &syncs, &changes, container)
            .await
        {
            Ok(outcome) => BuildResult::Success(outcome),
            Err(e) => BuildResult::Fatal(e),
        }
    }
}
