// ABOUTME: Full-rebuild strategy for docker compose services.
// ABOUTME: Hands the whole rebuild to the compose client.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::result::{BuildError, BuildOutcome, BuildResult, Deployed, RedirectReason, StrategyKind};
use super::strategy::BuildAndDeployer;
use super::target::BuildTarget;
use crate::runtime::traits::ComposeClient;
use crate::types::ChangeSet;

pub struct ComposeBuildStrategy {
    client: Arc<dyn ComposeClient>,
}

impl ComposeBuildStrategy {
    pub fn new(client: Arc<dyn ComposeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BuildAndDeployer for ComposeBuildStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ComposeBuild
    }

    fn can_apply(&self, target: &BuildTarget, _changes: &ChangeSet) -> bool {
        target.compose_service.is_some()
    }

    async fn build_and_deploy(
        &self,
        cancel: &CancellationToken,
        target: &BuildTarget,
        _changes: &ChangeSet,
    ) -> BuildResult {
        let Some(ref service) = target.compose_service else {
            return BuildResult::Redirect(RedirectReason::not_applicable(
                "target has no compose service",
            ));
        };

        tracing::info!(service, target = %target.name, "rebuilding compose service");
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return BuildResult::Fatal(BuildError::Cancelled { after: None }),
            result = self.client.build_and_up(service, target.compose_context()) => result,
        };

        match result {
            Ok(()) => BuildResult::Success(BuildOutcome::new(
                StrategyKind::ComposeBuild,
                target.name.clone(),
                Deployed::ComposeService(service.clone()),
            )),
            Err(source) => BuildResult::Fatal(BuildError::Compose {
                service: service.clone(),
                source,
            }),
        }
    }
}
