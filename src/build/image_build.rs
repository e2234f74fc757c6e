// ABOUTME: Full-rebuild strategy for cluster workloads.
// ABOUTME: Builds (or reuses) an image, pushes it when a registry is set, then rolls it out.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::result::{BuildError, BuildOutcome, BuildResult, Deployed, RedirectReason, StrategyKind};
use super::strategy::BuildAndDeployer;
use super::target::{BuildTarget, ImageSpec};
use crate::runtime::traits::{ClusterClient, ImageBuilder};
use crate::types::{ChangeSet, ImageRef};

pub struct ImageBuildStrategy {
    builder: Arc<dyn ImageBuilder>,
    cluster: Arc<dyn ClusterClient>,
    /// Registry the cluster pulls from; images are pushed there when set.
    registry: Option<String>,
}

impl ImageBuildStrategy {
    pub fn new(builder: Arc<dyn ImageBuilder>, cluster: Arc<dyn ClusterClient>) -> Self {
        Self {
            builder,
            cluster,
            registry: None,
        }
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    fn repository(&self, spec: &ImageSpec) -> ImageRef {
        match self.registry {
            Some(ref registry) => spec.repository.with_registry(registry.clone()),
            None => spec.repository.clone(),
        }
    }

    async fn build_and_roll_out(
        &self,
        cancel: &CancellationToken,
        target: &BuildTarget,
        spec: &ImageSpec,
    ) -> Result<BuildOutcome, BuildError> {
        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled { after: None });
        }
        let mut key = spec.cache_key().map_err(|source| BuildError::Context {
            context: spec.context.clone(),
            source,
        })?;
        tracing::debug!(digest = %key.digest, context = %spec.context.display(), "computed cache key");
        key.repository = self.repository(spec);
        let tag = key.image();

        let cached = cancellable(cancel, None, self.builder.cache_lookup(&key)).await??;
        let cache_hit = cached.is_some();
        let image = match cached {
            Some(image) => {
                tracing::info!(%image, "reusing cached image");
                image
            }
            None => {
                tracing::info!(image = %tag, context = %spec.context.display(), "building image");
                cancellable(cancel, None, self.builder.build(&spec.build_context(), &tag)).await??
            }
        };
        let built = format!("build {}", image);

        if self.registry.is_some() {
            tracing::info!(%image, "pushing image");
            cancellable(cancel, Some(&built), self.builder.push(&image)).await??;
        }

        if let Some(ref manifest) = target.manifest {
            check_cancel(cancel, &built)?;
            self.cluster
                .apply_and_wait(manifest)
                .await
                .map_err(|source| BuildError::Deploy {
                    image: image.to_string(),
                    source,
                })?;
        }

        check_cancel(cancel, &built)?;
        self.cluster
            .update_workload_image(&target.workload, &image)
            .await
            .map_err(|source| BuildError::Deploy {
                image: image.to_string(),
                source,
            })?;

        let mut outcome = BuildOutcome::new(
            StrategyKind::ImageBuild,
            target.name.clone(),
            Deployed::Image(image),
        );
        outcome.cache_hit = cache_hit;
        Ok(outcome)
    }
}

fn check_cancel(cancel: &CancellationToken, after: &str) -> Result<(), BuildError> {
    if cancel.is_cancelled() {
        return Err(BuildError::Cancelled {
            after: Some(after.to_string()),
        });
    }
    Ok(())
}

/// Race `fut` against cancellation; the future is dropped if the token fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    after: Option<&str>,
    fut: impl Future<Output = T>,
) -> Result<T, BuildError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BuildError::Cancelled {
            after: after.map(str::to_string),
        }),
        out = fut => Ok(out),
    }
}

#[async_trait]
impl BuildAndDeployer for ImageBuildStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ImageBuild
    }

    fn can_apply(&self, target: &BuildTarget, _changes: &ChangeSet) -> bool {
        target.image.is_some()
    }

    async fn build_and_deploy(
        &self,
        cancel: &CancellationToken,
        target: &BuildTarget,
        _changes: &ChangeSet,
    ) -> BuildResult {
        let Some(ref spec) = target.image else {
            return BuildResult::Redirect(RedirectReason::not_applicable(
                "target has no image definition",
            ));
        };

        match self.build_and_roll_out(cancel, target, spec).await {
            Ok(outcome) => BuildResult::Success(outcome),
            Err(e) => BuildResult::Fatal(e),
        }
    }
}
