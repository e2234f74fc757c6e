// ABOUTME: Compose client backed by the `docker compose` CLI.
// ABOUTME: Rebuilds one service and recreates its container.

use super::process::ProcessRunner;
use super::traits::{ComposeClient, ComposeError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Runs `docker compose up --build` for one service.
///
/// The service's `build.context` in the compose file decides what is built;
/// compose has no flag to override it. The context handed to
/// [`ComposeClient::build_and_up`] is only checked to exist.
#[derive(Debug, Clone)]
pub struct ComposeCli {
    compose_file: PathBuf,
    project_dir: PathBuf,
}

impl ComposeCli {
    pub fn new(compose_file: impl Into<PathBuf>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            compose_file: compose_file.into(),
            project_dir: project_dir.into(),
        }
    }

    fn build_and_up_args(&self, service: &str) -> Vec<String> {
        vec![
            "compose".to_string(),
            "-f".to_string(),
            self.compose_file.display().to_string(),
            "up".to_string(),
            "--build".to_string(),
            "--detach".to_string(),
            "--no-deps".to_string(),
            service.to_string(),
        ]
    }
}

#[async_trait]
impl ComposeClient for ComposeCli {
    async fn build_and_up(&self, service: &str, context: &Path) -> Result<(), ComposeError> {
        if !self.compose_file.is_file() {
            return Err(ComposeError::ComposeFileNotFound(
                self.compose_file.display().to_string(),
            ));
        }
        if !context.is_dir() {
            return Err(ComposeError::ContextNotFound(context.display().to_string()));
        }
        tracing::info!(service, context = %context.display(), "rebuilding compose service");
        ProcessRunner::new("docker")
            .args(self.build_and_up_args(service))
            .current_dir(&self.project_dir)
            .run()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_args_target_single_service() {
        let cli = ComposeCli::new("/proj/docker-compose.yml", "/proj");
        assert_eq!(
            cli.build_and_up_args("web"),
            vec![
                "compose",
                "-f",
                "/proj/docker-compose.yml",
                "up",
                "--build",
                "--detach",
                "--no-deps",
                "web"
            ]
        );
    }

    #[tokio::test]
    async fn missing_context_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let compose_file = dir.path().join("compose.yml");
        std::fs::write(&compose_file, "services: {}\n").unwrap();
        let cli = ComposeCli::new(&compose_file, dir.path());

        let err = cli
            .build_and_up("web", &dir.path().join("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ComposeError::ContextNotFound(_)));
    }

    #[tokio::test]
    async fn missing_compose_file_is_error() {
        let cli = ComposeCli::new("/nonexistent/hotpatch/compose.yml", "/nonexistent");
        let err = cli
            .build_and_up("web", Path::new("/nonexistent"))
            .await
            .unwrap_err();
        assert!(matches!(err, ComposeError::ComposeFileNotFound(_)));
    }
}
