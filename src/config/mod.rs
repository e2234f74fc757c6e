// ABOUTME: Configuration types and parsing for hotpatch.yml.
// ABOUTME: Declares environment, named live-update steps and targets; evaluation builds targets.

mod deserialize;
mod evaluate;
mod init;

pub use evaluate::{ConfigProblem, Project};
pub use init::{TEMPLATE, init_config};

use crate::build::{ClusterLocation, DeployKind, Environment, UpdateMode};
use crate::liveupdate::StepSpec;
use crate::runtime::{RuntimeConfig, RuntimeType};
use crate::types::{ImageRef, TargetName, WorkloadRef};
use deserialize::{deserialize_image_ref_option, deserialize_targets, deserialize_workload_ref_option};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "hotpatch.yml";
pub const CONFIG_FILENAME_ALT: &str = "hotpatch.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".hotpatch/config.yml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found in {0}")]
    NotFound(PathBuf),

    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{}", format_problems(.0))]
    Invalid(Vec<ConfigProblem>),
}

fn format_problems(problems: &[ConfigProblem]) -> String {
    let mut out = format!("{} problem(s) in configuration:", problems.len());
    for problem in problems {
        out.push_str("\n  - ");
        out.push_str(&problem.to_string().replace('\n', "\n    "));
    }
    out
}

impl ConfigError {
    /// Individual problems, when this is an evaluation failure.
    pub fn problems(&self) -> &[ConfigProblem] {
        match self {
            ConfigError::Invalid(problems) => problems,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub update_mode: UpdateMode,

    #[serde(default)]
    pub environment: EnvironmentConfig,

    #[serde(default)]
    pub runtime: Option<RuntimeConfig>,

    #[serde(default = "default_deploy_timeout", with = "humantime_serde")]
    pub deploy_timeout: Duration,

    /// Named steps that targets refer to from their `live_update` lists.
    #[serde(default)]
    pub steps: BTreeMap<String, StepSpec>,

    #[serde(deserialize_with = "deserialize_targets")]
    pub targets: NonEmpty<TargetConfig>,
}

fn default_deploy_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Where workloads run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EnvironmentConfig {
    Cluster {
        #[serde(default)]
        cluster: ClusterLocation,
        /// Registry the cluster pulls from. Built images are pushed here.
        #[serde(default)]
        registry: Option<String>,
        /// kubeconfig context; the current context when unset.
        #[serde(default)]
        context: Option<String>,
    },
    Compose {
        #[serde(default = "default_compose_file")]
        compose_file: PathBuf,
    },
}

fn default_compose_file() -> PathBuf {
    PathBuf::from("docker-compose.yml")
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig::Cluster {
            cluster: ClusterLocation::Local,
            registry: None,
            context: None,
        }
    }
}

impl EnvironmentConfig {
    pub fn deploy_kind(&self) -> DeployKind {
        match self {
            EnvironmentConfig::Cluster { cluster, .. } => DeployKind::Cluster(*cluster),
            EnvironmentConfig::Compose { .. } => DeployKind::Compose,
        }
    }

    pub fn registry(&self) -> Option<&str> {
        match self {
            EnvironmentConfig::Cluster { registry, .. } => registry.as_deref(),
            EnvironmentConfig::Compose { .. } => None,
        }
    }

    /// The environment as seen by the build-order composer.
    pub fn environment(&self, runtime: Option<RuntimeType>) -> Environment {
        Environment::new(self.deploy_kind(), runtime)
    }
}

/// One entry of a target's `live_update` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StepEntry {
    /// Name of a step under `steps:`.
    Reference(String),
    Inline(StepSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub name: TargetName,

    /// Defaults to `deployment/<name>` on clusters and `service/<name>` on compose.
    #[serde(default, deserialize_with = "deserialize_workload_ref_option")]
    pub workload: Option<WorkloadRef>,

    /// Container within the workload, when it has more than one.
    #[serde(default)]
    pub container: Option<String>,

    #[serde(default, deserialize_with = "deserialize_image_ref_option")]
    pub image: Option<ImageRef>,

    #[serde(default)]
    pub context: Option<PathBuf>,

    #[serde(default)]
    pub dockerfile: Option<String>,

    #[serde(default)]
    pub build_args: BTreeMap<String, String>,

    #[serde(default)]
    pub manifest: Option<PathBuf>,

    #[serde(default)]
    pub compose_service: Option<String>,

    #[serde(default)]
    pub live_update: Vec<StepEntry>,
}

impl TargetConfig {
    pub fn workload_ref(&self, deploy: DeployKind) -> WorkloadRef {
        let workload = match self.workload {
            Some(ref w) => w.clone(),
            None => {
                let kind = match deploy {
                    DeployKind::Cluster(_) => "deployment",
                    DeployKind::Compose => "service",
                };
                WorkloadRef::new(kind, self.name.as_str())
            }
        };
        match self.container {
            Some(ref container) => workload.with_container(container.clone()),
            None => workload,
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(ConfigError::from)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Find and load the config file in `dir`, returning its path too.
    pub fn discover(dir: &Path) -> Result<(PathBuf, Self), ConfigError> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Ok((path.clone(), Self::load(path)?));
            }
        }

        Err(ConfigError::NotFound(dir.to_path_buf()))
    }

    pub fn target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.name.as_str() == name)
    }
}
