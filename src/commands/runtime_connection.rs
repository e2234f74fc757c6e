// ABOUTME: Shared helper for detecting the local runtime and wiring real adapters into strategies.
// ABOUTME: Used by the order and dispatch commands.

use hotpatch::build::{
    BuildOrder, ComposeBuildStrategy, ContainerPatchStrategy, Environment, ImageBuildStrategy,
    Strategies, UpdateMode,
};
use hotpatch::config::{EnvironmentConfig, Project};
use hotpatch::error::Result;
use hotpatch::output::Output;
use hotpatch::runtime::traits::RuntimeInfo;
use hotpatch::runtime::{
    BollardRuntime, ComposeCli, KubectlClient, RuntimeError, RuntimeErrorKind, detect_runtime,
};
use std::sync::Arc;

/// Detect the local container runtime and check that it answers.
///
/// A missing or unreachable runtime is not an error here: it just removes the
/// strategies that need one from the build order.
pub async fn connect_to_runtime(project: &Project, output: &Output) -> Option<Arc<BollardRuntime>> {
    output.progress("  → Detecting runtime...");
    let connected = async {
        let info = detect_runtime(project.config.runtime.as_ref()).map_err(RuntimeError::from)?;
        output.progress(&format!(
            "  → Found {} at {}",
            info.runtime_type, info.socket_path
        ));
        let runtime = BollardRuntime::connect(&info).map_err(RuntimeError::from)?;
        let metadata = runtime.info().await.map_err(RuntimeError::from)?;
        tracing::debug!(
            runtime = %metadata.name,
            version = %metadata.version,
            arch = %metadata.arch,
            "runtime connected"
        );
        output.progress(&format!(
            "  → Connected to {} {}",
            metadata.name, metadata.version
        ));
        Ok::<_, RuntimeError>(runtime)
    }
    .await;

    match connected {
        Ok(runtime) => Some(Arc::new(runtime)),
        Err(e) => {
            match e.kind() {
                RuntimeErrorKind::NoRuntimeFound => tracing::debug!("{}", e),
                _ => tracing::warn!("{}", e),
            }
            output.progress("  → No container runtime available");
            None
        }
    }
}

/// Build the strategy chain for `project` with real adapters.
pub fn build_order(
    project: &Project,
    runtime: Option<Arc<BollardRuntime>>,
    mode: Option<UpdateMode>,
) -> Result<(Environment, UpdateMode, BuildOrder)> {
    let config = &project.config;
    let env = config
        .environment
        .environment(runtime.as_ref().map(|r| r.runtime_type()));
    let mode = mode.unwrap_or(config.update_mode);

    let mut strategies = Strategies::default();

    if let Some(ref runtime) = runtime {
        strategies.container_patch = Some(Arc::new(ContainerPatchStrategy::new(runtime.clone())));
    }

    match config.environment {
        EnvironmentConfig::Cluster {
            ref registry,
            ref context,
            ..
        } => {
            if let Some(ref runtime) = runtime {
                let mut kubectl = KubectlClient::new(config.deploy_timeout);
                if let Some(context) = context {
                    kubectl = kubectl.with_context(context.clone());
                }
                let mut image_build = ImageBuildStrategy::new(runtime.clone(), Arc::new(kubectl));
                if let Some(registry) = registry {
                    image_build = image_build.with_registry(registry.clone());
                }
                strategies.image_build = Some(Arc::new(image_build));
            }
        }
        EnvironmentConfig::Compose { ref compose_file } => {
            let compose_file = if compose_file.is_absolute() {
                compose_file.clone()
            } else {
                project.dir.join(compose_file)
            };
            let client = ComposeCli::new(compose_file, project.dir.clone());
            strategies.compose_build = Some(Arc::new(ComposeBuildStrategy::new(Arc::new(client))));
        }
    }

    let order = BuildOrder::compose(&strategies, &env, mode)?;
    Ok((env, mode, order))
}
