// ABOUTME: Connectivity check for the local container runtime.
// ABOUTME: Reports the daemon's version so commands can show what they connected to.

use super::shared_types::RuntimeMetadata;
use async_trait::async_trait;

#[async_trait]
pub trait RuntimeInfo: Send + Sync {
    /// Ask the daemon who it is. Fails when the socket is unreachable.
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeInfoError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}
