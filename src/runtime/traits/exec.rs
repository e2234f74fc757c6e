// ABOUTME: Exec operations trait for container runtimes.
// ABOUTME: Run a shell command inside a running container and collect its output.

use super::shared_types::ExecResult;
use crate::types::{ContainerId, ShellCommand};
use async_trait::async_trait;

/// Exec operations: run commands in containers.
#[async_trait]
pub trait ExecOps: Send + Sync {
    /// Run `cmd` to completion inside the container.
    ///
    /// A command that ran and exited non-zero is `Ok` with that exit code;
    /// `Err` means the command could not be run at all.
    async fn exec_in_container(
        &self,
        container: &ContainerId,
        cmd: &ShellCommand,
    ) -> Result<ExecResult, ExecError>;
}

/// Errors from exec operations.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("container not running: {0}")]
    ContainerNotRunning(String),

    #[error("exec instance not found: {0}")]
    ExecNotFound(String),

    #[error("exec failed: {0}")]
    Failed(String),

    #[error("exec {0} finished without reporting an exit code")]
    MissingExitCode(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
