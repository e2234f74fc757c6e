// ABOUTME: Runtime detection on the developer's machine.
// ABOUTME: Honors explicit config and DOCKER_HOST, then checks Podman sockets before Docker.

use super::types::{DetectedRuntime, RuntimeConfig, RuntimeType};
use std::path::Path;

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked DOCKER_HOST, Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("unsupported DOCKER_HOST '{0}': only unix:// sockets are supported")]
    InvalidDockerHost(String),
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Detect the container runtime to use for live updates.
///
/// Detection order (when not explicitly configured):
/// 1. `DOCKER_HOST` (unix sockets only)
/// 2. Rootless Podman socket (`$XDG_RUNTIME_DIR/podman/podman.sock` or `/run/user/$UID/...`)
/// 3. Rootful Podman socket (`/run/podman/podman.sock`)
/// 4. Docker socket (`/var/run/docker.sock`)
pub fn detect_runtime(config: Option<&RuntimeConfig>) -> Result<DetectedRuntime, DetectionError> {
    let env = HostEnv {
        docker_host: std::env::var("DOCKER_HOST").ok().filter(|v| !v.is_empty()),
        runtime_dir: std::env::var("XDG_RUNTIME_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| get_uid().map(|uid| format!("/run/user/{}", uid))),
    };
    detect_with(config, &env, |path| path.exists())
}

/// What detection reads from the process environment.
#[derive(Debug, Clone, Default)]
pub(crate) struct HostEnv {
    pub docker_host: Option<String>,
    pub runtime_dir: Option<String>,
}

pub(crate) fn detect_with(
    config: Option<&RuntimeConfig>,
    env: &HostEnv,
    exists: impl Fn(&Path) -> bool,
) -> Result<DetectedRuntime, DetectionError> {
    if let Some(cfg) = config
        && let Some(runtime_type) = cfg.runtime
    {
        let socket_path = cfg
            .socket
            .clone()
            .unwrap_or_else(|| default_socket_path(runtime_type));
        return Ok(DetectedRuntime {
            runtime_type,
            socket_path,
        });
    }

    if let Some(ref host) = env.docker_host {
        let socket_path = host
            .strip_prefix("unix://")
            .ok_or_else(|| DetectionError::InvalidDockerHost(host.clone()))?;
        let runtime_type = if socket_path.contains("podman") {
            RuntimeType::Podman
        } else {
            RuntimeType::Docker
        };
        return Ok(DetectedRuntime {
            runtime_type,
            socket_path: socket_path.to_string(),
        });
    }

    // 1. Rootless Podman
    if let Some(ref dir) = env.runtime_dir {
        let rootless_socket = format!("{}/podman/podman.sock", dir);
        if exists(Path::new(&rootless_socket)) {
            return Ok(DetectedRuntime {
                runtime_type: RuntimeType::Podman,
                socket_path: rootless_socket,
            });
        }
    }

    // 2. Rootful Podman
    if exists(Path::new(ROOTFUL_PODMAN)) {
        return Ok(DetectedRuntime {
            runtime_type: RuntimeType::Podman,
            socket_path: ROOTFUL_PODMAN.to_string(),
        });
    }

    // 3. Docker
    if exists(Path::new(DOCKER_SOCKET)) {
        return Ok(DetectedRuntime {
            runtime_type: RuntimeType::Docker,
            socket_path: DOCKER_SOCKET.to_string(),
        });
    }

    Err(DetectionError::NoRuntimeFound)
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        // Fall back to reading /proc/self/status
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

fn default_socket_path(runtime: RuntimeType) -> String {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET.to_string(),
        RuntimeType::Podman => ROOTFUL_PODMAN.to_string(),
    }
}
