// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Supports both Docker and Podman via Docker-compatible API.

use crate::runtime::traits::{
    BuildContext, CacheKey, ContainerError, ContainerOps, CopyError, CopyOps, ExecError, ExecOps,
    ExecResult, ImageBuilder, ImageError, RESTART_TIMEOUT, RuntimeInfo, RuntimeInfoError,
    RuntimeMetadata,
};
use crate::runtime::types::{DetectedRuntime, RuntimeType};
use crate::types::{ContainerId, ImageRef, ShellCommand, WorkloadRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::exec::StartExecOptions;
use bollard::query_parameters::{
    BuildImageOptions, ListContainersOptions, PushImageOptions, RestartContainerOptions,
    UploadToContainerOptions,
};
use bytes::Bytes;
use futures::StreamExt;
use http_body_util::{Either, Full};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Label docker compose puts on every service container.
const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";
/// Labels the kubelet puts on containers it runs through dockershim/cri-dockerd.
const K8S_CONTAINER_LABEL: &str = "io.kubernetes.container.name";
const K8S_POD_LABEL: &str = "io.kubernetes.pod.name";

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_container_not_found_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_upload_error(e: bollard::errors::Error) -> CopyError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => CopyError::ContainerNotFound(message.clone()),
        _ => CopyError::Runtime(e.to_string()),
    }
}

fn map_exec_create_error(e: bollard::errors::Error) -> ExecError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ExecError::ContainerNotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ExecError::ContainerNotRunning(message.clone()),
        _ => ExecError::Runtime(e.to_string()),
    }
}

fn map_exec_not_found_error(e: bollard::errors::Error) -> ExecError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ExecError::ExecNotFound(message.clone()),
        _ => ExecError::Runtime(e.to_string()),
    }
}

// =============================================================================
// Archive Helpers
// =============================================================================

/// Split an absolute container path into the directory to upload into and
/// the entry name the archive should carry.
fn split_remote(remote: &str) -> Result<(String, String), CopyError> {
    let trimmed = remote.trim_end_matches('/');
    let path = Path::new(trimmed);
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if path.is_absolute() => Ok((
            parent.display().to_string(),
            name.to_string_lossy().to_string(),
        )),
        _ => Err(CopyError::InvalidRemotePath(remote.to_string())),
    }
}

/// Tar `local` so that extracting it in the parent of the remote path recreates it under `name`.
fn archive_path(local: &Path, name: &str) -> Result<Vec<u8>, CopyError> {
    let read_err = |source: std::io::Error| CopyError::LocalRead {
        path: local.to_path_buf(),
        source,
    };
    let metadata = std::fs::metadata(local).map_err(read_err)?;
    let mut builder = tar::Builder::new(Vec::new());
    if metadata.is_dir() {
        builder.append_dir_all(name, local).map_err(read_err)?;
    } else {
        builder
            .append_path_with_name(local, name)
            .map_err(read_err)?;
    }
    builder.into_inner().map_err(read_err)
}

/// Tar a whole build context directory.
fn archive_context(dir: &Path) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.append_dir_all(".", dir)?;
    builder.into_inner()
}

/// An exec that stopped running must report how it exited; a missing code is not success.
fn finished_exit_code(exec_id: &str, exit_code: Option<i64>) -> Result<i64, ExecError> {
    exit_code.ok_or_else(|| ExecError::MissingExitCode(exec_id.to_string()))
}

/// Whether a container's labels and names identify it as the workload's container.
fn matches_workload(
    labels: &HashMap<String, String>,
    names: &[String],
    workload: &WorkloadRef,
) -> bool {
    let container = workload.container().unwrap_or_else(|| workload.name());

    if labels.get(COMPOSE_SERVICE_LABEL).map(String::as_str) == Some(workload.name()) {
        return true;
    }

    if let (Some(name), Some(pod)) = (labels.get(K8S_CONTAINER_LABEL), labels.get(K8S_POD_LABEL))
        && name == container
        && (pod == workload.name() || pod.starts_with(&format!("{}-", workload.name())))
    {
        return true;
    }

    names
        .iter()
        .any(|n| n.trim_start_matches('/') == workload.name())
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
///
/// Supports both Docker and Podman via Docker-compatible API.
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
}

impl BollardRuntime {
    /// Create a new BollardRuntime from a Docker client.
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
        }
    }

    /// Connect to a container runtime using detected runtime info.
    pub fn connect(info: &DetectedRuntime) -> Result<Self, RuntimeInfoError> {
        let client =
            Docker::connect_with_unix(&info.socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;
        Ok(Self::new(client, info.runtime_type))
    }

    /// Get the runtime type (Docker or Podman).
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    async fn exec_create(
        &self,
        container: &ContainerId,
        cmd: &ShellCommand,
    ) -> Result<String, ExecError> {
        let opts = bollard::models::ExecConfig {
            cmd: Some(cmd.argv()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            ..Default::default()
        };

        let response = self
            .client
            .create_exec(container.as_str(), opts)
            .await
            .map_err(map_exec_create_error)?;

        Ok(response.id)
    }

    async fn exec_start(&self, exec_id: &str) -> Result<ExecResult, ExecError> {
        // Podman has issues with exec output streams not closing properly,
        // causing attached mode to hang. Use detached mode + polling for Podman.
        if self.runtime_type == RuntimeType::Podman {
            return self.exec_start_detached(exec_id).await;
        }

        let opts = StartExecOptions {
            detach: false,
            ..Default::default()
        };

        let result = self
            .client
            .start_exec(exec_id, Some(opts))
            .await
            .map_err(map_exec_not_found_error)?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        if let bollard::exec::StartExecResults::Attached { mut output, .. } = result {
            while let Some(item) = output.next().await {
                match item {
                    Ok(bollard::container::LogOutput::StdOut { message }) => {
                        stdout.extend(message);
                    }
                    Ok(bollard::container::LogOutput::StdErr { message }) => {
                        stderr.extend(message);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        return Err(ExecError::Failed(e.to_string()));
                    }
                }
            }
        }

        let exit_code = finished_exit_code(exec_id, self.exec_exit_code(exec_id).await?)?;

        Ok(ExecResult {
            exit_code,
            stdout,
            stderr,
        })
    }

    /// Execute in detached mode and poll for completion.
    ///
    /// Output is not captured in this mode, so a failing command reports only
    /// its exit code.
    async fn exec_start_detached(&self, exec_id: &str) -> Result<ExecResult, ExecError> {
        let opts = StartExecOptions {
            detach: true,
            ..Default::default()
        };

        self.client
            .start_exec(exec_id, Some(opts))
            .await
            .map_err(map_exec_not_found_error)?;

        let poll_interval = std::time::Duration::from_millis(100);
        let max_wait = std::time::Duration::from_secs(300);
        let start = std::time::Instant::now();

        loop {
            let details = self
                .client
                .inspect_exec(exec_id)
                .await
                .map_err(map_exec_not_found_error)?;
            if !details.running.unwrap_or(false) {
                return Ok(ExecResult {
                    exit_code: finished_exit_code(exec_id, details.exit_code)?,
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                });
            }

            if start.elapsed() > max_wait {
                return Err(ExecError::Failed("exec timed out".to_string()));
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn exec_exit_code(&self, exec_id: &str) -> Result<Option<i64>, ExecError> {
        let details = self
            .client
            .inspect_exec(exec_id)
            .await
            .map_err(map_exec_not_found_error)?;
        Ok(details.exit_code)
    }
}

#[async_trait]
impl RuntimeInfo for BollardRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| RuntimeInfoError::ConnectionFailed(e.to_string()))?;

        let name = match self.runtime_type {
            RuntimeType::Docker => "Docker".to_string(),
            RuntimeType::Podman => "Podman".to_string(),
        };

        Ok(RuntimeMetadata {
            name,
            version: info.server_version.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn find_running_container(
        &self,
        workload: &WorkloadRef,
    ) -> Result<Option<ContainerId>, ContainerError> {
        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        filters.insert("status".to_string(), vec!["running".to_string()]);

        let opts = ListContainersOptions {
            all: false,
            filters: Some(filters),
            ..Default::default()
        };

        // Podman reports "stopping" as a container state during shutdown, but bollard
        // doesn't recognize it and fails deserialization. Retry after a short delay
        // since "stopping" is a transient state.
        let mut last_error = None;
        for attempt in 0..3 {
            match self.client.list_containers(Some(opts.clone())).await {
                Ok(containers) => {
                    let found = containers.into_iter().find_map(|c| {
                        let labels = c.labels.unwrap_or_default();
                        let names = c.names.unwrap_or_default();
                        if matches_workload(&labels, &names, workload) {
                            c.id.map(ContainerId::new)
                        } else {
                            None
                        }
                    });
                    tracing::debug!(%workload, found = ?found.as_ref().map(|id| id.short()), "container lookup");
                    return Ok(found);
                }
                Err(e) => {
                    let err_str = e.to_string();
                    if (err_str.contains("unknown variant `stopping`")
                        || err_str.contains("unknown variant `stopped`"))
                        && attempt < 2
                    {
                        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                        last_error = Some(err_str);
                        continue;
                    }
                    return Err(ContainerError::Runtime(err_str));
                }
            }
        }

        Err(ContainerError::Runtime(
            last_error.unwrap_or_else(|| "list_containers failed".to_string()),
        ))
    }

    async fn restart_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        let opts = RestartContainerOptions {
            t: Some(RESTART_TIMEOUT.as_secs() as i32),
            signal: None,
        };

        self.client
            .restart_container(id.as_str(), Some(opts))
            .await
            .map_err(map_container_not_found_error)
    }
}

#[async_trait]
impl CopyOps for BollardRuntime {
    async fn copy_to_container(
        &self,
        container: &ContainerId,
        local: &Path,
        remote: &str,
    ) -> Result<(), CopyError> {
        let (parent, name) = split_remote(remote)?;
        let local_path: PathBuf = local.to_path_buf();

        let archive = tokio::task::spawn_blocking(move || archive_path(&local_path, &name))
            .await
            .map_err(|e| CopyError::Runtime(format!("archive task failed: {}", e)))??;

        tracing::debug!(
            container = container.short(),
            local = %local.display(),
            remote,
            bytes = archive.len(),
            "uploading archive"
        );

        let opts = UploadToContainerOptions {
            path: parent,
            ..Default::default()
        };
        let body = Either::Left(Full::new(Bytes::from(archive)));

        self.client
            .upload_to_container(container.as_str(), Some(opts), body)
            .await
            .map_err(map_upload_error)
    }
}

#[async_trait]
impl ExecOps for BollardRuntime {
    async fn exec_in_container(
        &self,
        container: &ContainerId,
        cmd: &ShellCommand,
    ) -> Result<ExecResult, ExecError> {
        let exec_id = self.exec_create(container, cmd).await?;
        self.exec_start(&exec_id).await
    }
}

#[async_trait]
impl ImageBuilder for BollardRuntime {
    async fn build(&self, context: &BuildContext, tag: &ImageRef) -> Result<ImageRef, ImageError> {
        let dir = context.context_dir.clone();
        let tar_data = tokio::task::spawn_blocking(move || archive_context(&dir))
            .await
            .map_err(|e| ImageError::Runtime(format!("archive task failed: {}", e)))?
            .map_err(|e| ImageError::Context {
                path: context.context_dir.display().to_string(),
                message: e.to_string(),
            })?;

        let buildargs: HashMap<String, String> = context
            .build_args
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let options = BuildImageOptions {
            dockerfile: context.dockerfile.clone(),
            t: Some(tag.to_string()),
            buildargs: Some(buildargs),
            rm: true,
            ..Default::default()
        };

        let body = Either::Left(Full::new(Bytes::from(tar_data)));
        let mut build_stream = self.client.build_image(options, None, Some(body));

        while let Some(result) = build_stream.next().await {
            match result {
                Ok(output) => {
                    if let Some(error_detail) = output.error_detail {
                        return Err(ImageError::BuildFailed {
                            image: tag.to_string(),
                            message: error_detail.message.unwrap_or_default(),
                        });
                    }
                    if let Some(line) = output.stream {
                        let line = line.trim();
                        if !line.is_empty() {
                            tracing::debug!(image = %tag, "{}", line);
                        }
                    }
                }
                Err(e) => {
                    return Err(ImageError::BuildFailed {
                        image: tag.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(tag.clone())
    }

    async fn cache_lookup(&self, key: &CacheKey) -> Result<Option<ImageRef>, ImageError> {
        let image = key.image();
        match self.client.inspect_image(&image.to_string()).await {
            Ok(_) => Ok(Some(image)),
            Err(bollard::errors::Error::DockerResponseServerError { status_code, .. })
                if status_code == 404 =>
            {
                Ok(None)
            }
            Err(e) => Err(ImageError::Runtime(e.to_string())),
        }
    }

    async fn push(&self, image: &ImageRef) -> Result<(), ImageError> {
        let opts = PushImageOptions {
            tag: image.tag().map(str::to_string),
            ..Default::default()
        };

        let mut stream = self.client.push_image(&image.repository(), Some(opts), None);
        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(error_detail) = info.error_detail {
                        return Err(ImageError::PushFailed {
                            image: image.to_string(),
                            message: error_detail.message.unwrap_or_default(),
                        });
                    }
                }
                Err(e) => {
                    return Err(ImageError::PushFailed {
                        image: image.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_exec_without_exit_code_is_an_error() {
        assert_eq!(finished_exit_code("e1", Some(0)).unwrap(), 0);
        assert_eq!(finished_exit_code("e1", Some(3)).unwrap(), 3);
        let err = finished_exit_code("e1", None).unwrap_err();
        assert!(matches!(err, ExecError::MissingExitCode(ref id) if id == "e1"));
    }

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn split_remote_directory() {
        let (parent, name) = split_remote("/app/src/").unwrap();
        assert_eq!(parent, "/app");
        assert_eq!(name, "src");
    }

    #[test]
    fn split_remote_rejects_root() {
        assert!(matches!(
            split_remote("/"),
            Err(CopyError::InvalidRemotePath(_))
        ));
    }

    #[test]
    fn compose_service_label_matches() {
        let workload = WorkloadRef::parse("service/web").unwrap();
        let l = labels(&[(COMPOSE_SERVICE_LABEL, "web")]);
        assert!(matches_workload(&l, &[], &workload));
    }

    #[test]
    fn kubernetes_labels_match_pod_prefix() {
        let workload = WorkloadRef::parse("deployment/web")
            .unwrap()
            .with_container("app");
        let l = labels(&[
            (K8S_CONTAINER_LABEL, "app"),
            (K8S_POD_LABEL, "web-7d9f8c-abcde"),
        ]);
        assert!(matches_workload(&l, &[], &workload));

        let other = labels(&[
            (K8S_CONTAINER_LABEL, "app"),
            (K8S_POD_LABEL, "webhook-1234"),
        ]);
        assert!(!matches_workload(&other, &[], &workload));
    }

    #[test]
    fn container_name_matches() {
        let workload = WorkloadRef::parse("container/web").unwrap();
        assert!(matches_workload(
            &HashMap::new(),
            &["/web".to_string()],
            &workload
        ));
        assert!(!matches_workload(
            &HashMap::new(),
            &["/api".to_string()],
            &workload
        ));
    }

    #[test]
    fn archive_file_uses_remote_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.py");
        std::fs::write(&file, "print('hi')").unwrap();

        let data = archive_path(&file, "app.py").unwrap();
        let mut archive = tar::Archive::new(data.as_slice());
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["app.py"]);
    }

    #[test]
    fn archive_missing_path_is_local_read_error() {
        let err = archive_path(Path::new("/nonexistent/hotpatch/src"), "src").unwrap_err();
        assert!(matches!(err, CopyError::LocalRead { .. }));
    }
}
