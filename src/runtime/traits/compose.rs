// ABOUTME: Compose operations: rebuild and restart one service.
// ABOUTME: The compose-build strategy's only collaborator.

use crate::runtime::process::ProcessError;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait ComposeClient: Send + Sync {
    /// Rebuild the service's image and recreate its container.
    ///
    /// `context` is the source directory the change came from. Clients that
    /// cannot choose the build context themselves must still reject a missing one.
    async fn build_and_up(&self, service: &str, context: &Path) -> Result<(), ComposeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("compose file not found: {0}")]
    ComposeFileNotFound(String),

    #[error("compose build context not found: {0}")]
    ContextNotFound(String),
}
