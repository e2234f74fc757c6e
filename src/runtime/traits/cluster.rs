// ABOUTME: Cluster operations used after an image build.
// ABOUTME: Point a workload at a new image and apply manifests, waiting for rollout.

use crate::runtime::process::ProcessError;
use crate::types::{ImageRef, WorkloadRef};
use async_trait::async_trait;
use std::path::Path;

/// The deploy half of an image build against a cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Set the workload's container image and wait for the rollout.
    async fn update_workload_image(
        &self,
        workload: &WorkloadRef,
        image: &ImageRef,
    ) -> Result<(), ClusterError>;

    /// Apply a manifest and wait until its workloads are rolled out.
    async fn apply_and_wait(&self, manifest: &Path) -> Result<(), ClusterError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("manifest not found: {0}")]
    ManifestNotFound(String),
}
