// ABOUTME: Cluster client backed by the kubectl CLI.
// ABOUTME: Sets workload images and applies manifests, waiting for rollouts.

use super::process::ProcessRunner;
use super::traits::{ClusterClient, ClusterError};
use crate::types::{ImageRef, WorkloadRef};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Talks to the cluster through `kubectl`.
#[derive(Debug, Clone)]
pub struct KubectlClient {
    binary: String,
    context: Option<String>,
    timeout: Duration,
}

impl KubectlClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            binary: "kubectl".to_string(),
            context: None,
            timeout,
        }
    }

    /// Use a specific kubeconfig context instead of the current one.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn command(&self) -> ProcessRunner {
        let runner = ProcessRunner::new(&self.binary);
        match self.context {
            Some(ref context) => runner.arg("--context").arg(context),
            None => runner,
        }
    }

    fn timeout_arg(&self) -> String {
        format!("--timeout={}s", self.timeout.as_secs().max(1))
    }

    fn set_image_args(workload: &WorkloadRef, image: &ImageRef) -> Vec<String> {
        let container = workload
            .container()
            .unwrap_or_else(|| workload.name())
            .to_string();
        vec![
            "set".to_string(),
            "image".to_string(),
            format!("{}/{}", workload.kind(), workload.name()),
            format!("{}={}", container, image),
        ]
    }
}

#[async_trait]
impl ClusterClient for KubectlClient {
    async fn update_workload_image(
        &self,
        workload: &WorkloadRef,
        image: &ImageRef,
    ) -> Result<(), ClusterError> {
        tracing::info!(%workload, %image, "updating workload image");
        self.command()
            .args(Self::set_image_args(workload, image))
            .run()
            .await?;
        self.command()
            .args([
                "rollout".to_string(),
                "status".to_string(),
                format!("{}/{}", workload.kind(), workload.name()),
                self.timeout_arg(),
            ])
            .run()
            .await?;
        Ok(())
    }

    async fn apply_and_wait(&self, manifest: &Path) -> Result<(), ClusterError> {
        if !manifest.is_file() {
            return Err(ClusterError::ManifestNotFound(
                manifest.display().to_string(),
            ));
        }
        let path = manifest.display().to_string();
        tracing::info!(manifest = %path, "applying manifest");
        self.command()
            .args(["apply", "-f", path.as_str()])
            .run()
            .await?;
        self.command()
            .args([
                "rollout".to_string(),
                "status".to_string(),
                "-f".to_string(),
                path,
                self.timeout_arg(),
            ])
            .run()
            .await?;
        Ok(())
    }
}
