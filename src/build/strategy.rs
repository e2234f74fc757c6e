// ABOUTME: The contract every update strategy implements.
// ABOUTME: A cheap applicability check plus the cancellable build-and-deploy itself.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::result::{BuildResult, StrategyKind};
use super::target::BuildTarget;
use crate::types::ChangeSet;

/// One way of getting a change onto a running workload.
///
/// Implementations hold only long-lived collaborators. `build_and_deploy`
/// must not cause side effects on any path that ends in
/// [`BuildResult::Redirect`].
#[async_trait]
pub trait BuildAndDeployer: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Whether this strategy could handle the change at all. Must not do I/O.
    fn can_apply(&self, target: &BuildTarget, changes: &ChangeSet) -> bool;

    async fn build_and_deploy(
        &self,
        cancel: &CancellationToken,
        target: &BuildTarget,
        changes: &ChangeSet,
    ) -> BuildResult;
}
