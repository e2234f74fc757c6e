// ABOUTME: Per-target lock so two updates of the same target never overlap.
// ABOUTME: Different targets are dispatched concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use super::composite::{CompositeBuildAndDeployer, DispatchError, DispatchReport};
use super::target::BuildTarget;
use crate::types::{ChangeSet, TargetName};

/// A held target lock that releases on drop.
#[derive(Debug)]
pub struct TargetLock {
    target: TargetName,
    _guard: OwnedMutexGuard<()>,
}

impl TargetLock {
    pub fn target(&self) -> &TargetName {
        &self.target
    }
}

/// Hands out one lock per target name.
///
/// Only callers sharing one instance are serialized, so a process that runs
/// several dispatches (a file watcher, a daemon) keeps a single `TargetLocks`.
#[derive(Debug, Default)]
pub struct TargetLocks {
    locks: Mutex<HashMap<TargetName, Arc<AsyncMutex<()>>>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, target: &TargetName) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(target.clone()).or_default())
    }

    /// Wait for the target's lock.
    pub async fn acquire(&self, target: &TargetName) -> TargetLock {
        let guard = self.slot(target).lock_owned().await;
        tracing::trace!(%target, "target lock acquired");
        TargetLock {
            target: target.clone(),
            _guard: guard,
        }
    }

    /// Take the target's lock only if nobody holds it.
    pub fn try_acquire(&self, target: &TargetName) -> Option<TargetLock> {
        let guard = self.slot(target).try_lock_owned().ok()?;
        Some(TargetLock {
            target: target.clone(),
            _guard: guard,
        })
    }

    /// Dispatch with the target's lock held for the whole walk.
    ///
    /// Cancellation while waiting for the lock gives up without touching anything.
    pub async fn dispatch_serialized(
        &self,
        composite: &CompositeBuildAndDeployer,
        cancel: &CancellationToken,
        target: &BuildTarget,
        changes: &ChangeSet,
    ) -> Result<DispatchReport, DispatchError> {
        let _lock = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(DispatchError::Cancelled {
                    target: target.name.clone(),
                    strategy: None,
                    redirects: Vec::new(),
                });
            }
            lock = self.acquire(&target.name) => lock,
        };
        composite.dispatch(cancel, target, changes).await
    }
}
