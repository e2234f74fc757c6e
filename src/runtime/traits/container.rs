// ABOUTME: Container lookup and restart operations.
// ABOUTME: Finds the running container behind a workload and restarts its main process.

use crate::types::{ContainerId, WorkloadRef};
use async_trait::async_trait;

/// Container lifecycle operations the live-update path needs.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// Find a running container for the workload, if the runtime can see one.
    async fn find_running_container(
        &self,
        workload: &WorkloadRef,
    ) -> Result<Option<ContainerId>, ContainerError>;

    /// Restart the container's main process.
    async fn restart_container(&self, id: &ContainerId) -> Result<(), ContainerError>;
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
