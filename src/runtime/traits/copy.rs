// ABOUTME: Copy operations trait for container runtimes.
// ABOUTME: Overwrite a path inside a container with a local file or directory.

use crate::types::ContainerId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Copy files from the host into a container.
#[async_trait]
pub trait CopyOps: Send + Sync {
    /// Replace `remote` inside the container with the contents of `local`.
    async fn copy_to_container(
        &self,
        container: &ContainerId,
        local: &Path,
        remote: &str,
    ) -> Result<(), CopyError>;
}

/// Errors from copy operations.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("failed to read {path}: {source}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid container path: {0}")]
    InvalidRemotePath(String),

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
