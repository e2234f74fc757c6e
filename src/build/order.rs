// ABOUTME: Decides which strategies may run, and in what order, for an environment and mode.
// ABOUTME: The resulting BuildOrder is computed once and shared read-only.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::result::StrategyKind;
use super::strategy::BuildAndDeployer;
use crate::runtime::RuntimeType;

/// Which kinds of update the user allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateMode {
    /// Patch in place when possible, rebuild otherwise.
    #[default]
    Auto,
    /// Always rebuild the image.
    #[serde(alias = "image")]
    FullBuildOnly,
    /// Only ever patch the running container.
    #[serde(alias = "container")]
    LiveOnly,
}

impl UpdateMode {
    pub fn allows_live_update(self) -> bool {
        !matches!(self, UpdateMode::FullBuildOnly)
    }

    pub fn allows_full_build(self) -> bool {
        !matches!(self, UpdateMode::LiveOnly)
    }

    /// Check the mode can be honored in `env`.
    pub fn resolve(self, env: &Environment) -> Result<Self, OrderError> {
        if self == UpdateMode::LiveOnly && env.runtime.is_none() {
            return Err(OrderError::LiveOnlyWithoutRuntime);
        }
        Ok(self)
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateMode::Auto => write!(f, "auto"),
            UpdateMode::FullBuildOnly => write!(f, "full-build-only"),
            UpdateMode::LiveOnly => write!(f, "live-only"),
        }
    }
}

impl FromStr for UpdateMode {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(UpdateMode::Auto),
            "full-build-only" | "image" => Ok(UpdateMode::FullBuildOnly),
            "live-only" | "container" => Ok(UpdateMode::LiveOnly),
            other => Err(OrderError::UnknownMode(other.to_string())),
        }
    }
}

/// Where the cluster runs, relative to this machine's container runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterLocation {
    /// Cluster nodes share the local runtime (kind, minikube, Docker Desktop).
    #[default]
    Local,
    Remote,
}

/// How workloads are deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployKind {
    Cluster(ClusterLocation),
    Compose,
}

impl fmt::Display for DeployKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployKind::Cluster(ClusterLocation::Local) => write!(f, "local cluster"),
            DeployKind::Cluster(ClusterLocation::Remote) => write!(f, "remote cluster"),
            DeployKind::Compose => write!(f, "compose"),
        }
    }
}

/// Everything about the machine that decides which strategies can work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub deploy: DeployKind,
    pub runtime: Option<RuntimeType>,
}

impl Environment {
    pub fn new(deploy: DeployKind, runtime: Option<RuntimeType>) -> Self {
        Self { deploy, runtime }
    }

    /// Whether the runtime on this machine can see the workload's containers.
    fn containers_reachable(&self) -> bool {
        self.runtime.is_some()
            && matches!(
                self.deploy,
                DeployKind::Cluster(ClusterLocation::Local) | DeployKind::Compose
            )
    }

    fn supports(&self, kind: StrategyKind) -> bool {
        match kind {
            StrategyKind::ContainerPatch => self.containers_reachable(),
            StrategyKind::ImageBuild => matches!(self.deploy, DeployKind::Cluster(_)),
            StrategyKind::ComposeBuild => matches!(self.deploy, DeployKind::Compose),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("no update strategy can run with a {deploy} environment in {mode} mode")]
    NoStrategies { deploy: DeployKind, mode: UpdateMode },

    #[error("live-only mode needs a container runtime, but none was detected")]
    LiveOnlyWithoutRuntime,

    #[error("unknown update mode '{0}' (expected auto, full-build-only or live-only)")]
    UnknownMode(String),
}

/// The candidate strategies, one slot per kind.
#[derive(Clone, Default)]
pub struct Strategies {
    pub container_patch: Option<Arc<dyn BuildAndDeployer>>,
    pub image_build: Option<Arc<dyn BuildAndDeployer>>,
    pub compose_build: Option<Arc<dyn BuildAndDeployer>>,
}

impl Strategies {
    /// Candidates in priority order.
    fn prioritized(&self) -> impl Iterator<Item = (StrategyKind, &Arc<dyn BuildAndDeployer>)> {
        [
            (StrategyKind::ContainerPatch, &self.container_patch),
            (StrategyKind::ImageBuild, &self.image_build),
            (StrategyKind::ComposeBuild, &self.compose_build),
        ]
        .into_iter()
        .filter_map(|(kind, slot)| slot.as_ref().map(|s| (kind, s)))
    }
}

/// Ordered, non-empty, immutable list of strategies.
#[derive(Clone)]
pub struct BuildOrder {
    strategies: Arc<[Arc<dyn BuildAndDeployer>]>,
}

impl BuildOrder {
    pub fn new(strategies: Vec<Arc<dyn BuildAndDeployer>>) -> Option<Self> {
        if strategies.is_empty() {
            return None;
        }
        Some(Self {
            strategies: strategies.into(),
        })
    }

    /// Pick the strategies `env` and `mode` permit, highest priority first:
    /// container-patch, image-build, compose-build.
    pub fn compose(
        strategies: &Strategies,
        env: &Environment,
        mode: UpdateMode,
    ) -> Result<Self, OrderError> {
        let mode = mode.resolve(env)?;
        let selected: Vec<Arc<dyn BuildAndDeployer>> = strategies
            .prioritized()
            .filter(|(kind, _)| match kind {
                StrategyKind::ContainerPatch => mode.allows_live_update(),
                StrategyKind::ImageBuild | StrategyKind::ComposeBuild => mode.allows_full_build(),
            })
            .filter(|(kind, _)| env.supports(*kind))
            .map(|(_, strategy)| Arc::clone(strategy))
            .collect();

        tracing::debug!(
            deploy = %env.deploy,
            runtime = ?env.runtime,
            %mode,
            count = selected.len(),
            "composed build order"
        );

        Self::new(selected).ok_or(OrderError::NoStrategies {
            deploy: env.deploy,
            mode,
        })
    }

    pub fn strategies(&self) -> &[Arc<dyn BuildAndDeployer>] {
        &self.strategies
    }

    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl fmt::Debug for BuildOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes_and_aliases() {
        assert_eq!("auto".parse::<UpdateMode>().unwrap(), UpdateMode::Auto);
        assert_eq!(
            "image".parse::<UpdateMode>().unwrap(),
            UpdateMode::FullBuildOnly
        );
        assert_eq!(
            "container".parse::<UpdateMode>().unwrap(),
            UpdateMode::LiveOnly
        );
        assert!("sometimes".parse::<UpdateMode>().is_err());
    }

    #[test]
    fn mode_display_round_trips() {
        for mode in [UpdateMode::Auto, UpdateMode::FullBuildOnly, UpdateMode::LiveOnly] {
            assert_eq!(mode.to_string().parse::<UpdateMode>().unwrap(), mode);
        }
    }

    #[test]
    fn live_only_needs_runtime() {
        let env = Environment::new(DeployKind::Compose, None);
        assert!(matches!(
            UpdateMode::LiveOnly.resolve(&env),
            Err(OrderError::LiveOnlyWithoutRuntime)
        ));
        assert_eq!(UpdateMode::Auto.resolve(&env).unwrap(), UpdateMode::Auto);
    }

    #[test]
    fn remote_cluster_cannot_patch_containers() {
        let env = Environment::new(
            DeployKind::Cluster(ClusterLocation::Remote),
            Some(RuntimeType::Docker),
        );
        assert!(!env.supports(StrategyKind::ContainerPatch));
        assert!(env.supports(StrategyKind::ImageBuild));
        assert!(!env.supports(StrategyKind::ComposeBuild));
    }

    #[test]
    fn mode_deserializes_from_yaml() {
        let mode: UpdateMode = serde_yaml::from_str("full-build-only").unwrap();
        assert_eq!(mode, UpdateMode::FullBuildOnly);
        let alias: UpdateMode = serde_yaml::from_str("container").unwrap();
        assert_eq!(alias, UpdateMode::LiveOnly);
    }
}
