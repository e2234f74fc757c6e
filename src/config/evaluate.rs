// ABOUTME: Turns a parsed hotpatch.yml into build targets with validated live updates.
// ABOUTME: Declares every step in one session, converts per target, and reports all problems together.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use super::{CONFIG_FILENAME, Config, ConfigError, StepEntry, TargetConfig};
use crate::build::{BuildTarget, ImageSpec};
use crate::liveupdate::{DeclarationPos, DeclarationSession, LiveUpdateError, LiveUpdateStep, StepSpec};
use crate::types::TargetName;

/// One problem found while evaluating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigProblem {
    #[error("unknown step '{name}' referenced at {position}")]
    UnknownStep {
        name: String,
        position: DeclarationPos,
    },

    #[error("duplicate target name '{0}'")]
    DuplicateTarget(TargetName),

    #[error("target {target}: {source}")]
    LiveUpdate {
        target: TargetName,
        #[source]
        source: LiveUpdateError,
    },

    #[error("{0}")]
    Unconsumed(#[source] LiveUpdateError),

    #[error("target {target} has no image, compose_service or live_update, so nothing can update it")]
    NothingToDo { target: TargetName },
}

/// A loaded configuration together with the targets it declares.
#[derive(Debug, Clone)]
pub struct Project {
    pub dir: PathBuf,
    pub config: Config,
    pub targets: Vec<BuildTarget>,
}

impl Project {
    /// Discover the config in `dir` and evaluate it.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let (path, config) = Config::discover(dir)?;
        let source = path
            .strip_prefix(dir)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| CONFIG_FILENAME.to_string());
        Self::evaluate(dir, &source, config)
    }

    /// Evaluate an already-parsed config. `source` names the file in step positions.
    pub fn evaluate(dir: &Path, source: &str, config: Config) -> Result<Self, ConfigError> {
        let targets = build_targets(dir, source, &config)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            targets,
        })
    }

    pub fn target(&self, name: &str) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| t.name.as_str() == name)
    }
}

fn resolve(dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

fn build_targets(dir: &Path, source: &str, config: &Config) -> Result<Vec<BuildTarget>, ConfigError> {
    let mut session = DeclarationSession::new(dir);
    let mut problems = Vec::new();

    let named: HashMap<&str, LiveUpdateStep> = config
        .steps
        .iter()
        .map(|(name, spec)| {
            let position = DeclarationPos::new(source, format!("steps.{}", name));
            (name.as_str(), session.declare(spec.clone(), position))
        })
        .collect();

    let deploy = config.environment.deploy_kind();
    let mut seen = BTreeSet::new();
    let mut targets = Vec::with_capacity(config.targets.len());

    for (i, target) in config.targets.iter().enumerate() {
        if !seen.insert(target.name.clone()) {
            problems.push(ConfigProblem::DuplicateTarget(target.name.clone()));
            continue;
        }

        let steps = declare_target_steps(&mut session, &named, source, i, target, &mut problems);

        let mut build_target = BuildTarget::new(target.name.clone(), target.workload_ref(deploy), dir);

        if !steps.is_empty() {
            match session.convert(&steps) {
                Ok(live_update) => build_target = build_target.with_live_update(live_update),
                Err(source) => problems.push(ConfigProblem::LiveUpdate {
                    target: target.name.clone(),
                    source,
                }),
            }
        }

        if let Some(ref repository) = target.image {
            let context = resolve(dir, target.context.as_deref().unwrap_or(Path::new(".")));
            let mut spec = ImageSpec::new(repository.clone(), context);
            if let Some(ref dockerfile) = target.dockerfile {
                spec.dockerfile = dockerfile.clone();
            }
            spec.build_args = target.build_args.clone();
            build_target = build_target.with_image(spec);
        }

        if let Some(ref manifest) = target.manifest {
            build_target = build_target.with_manifest(resolve(dir, manifest));
        }

        if let Some(ref service) = target.compose_service {
            build_target = build_target.with_compose_service(service.clone());
        }

        if target.image.is_none() && target.compose_service.is_none() && target.live_update.is_empty()
        {
            problems.push(ConfigProblem::NothingToDo {
                target: target.name.clone(),
            });
        }

        targets.push(build_target);
    }

    if let Err(unused) = session.validate_all_consumed() {
        problems.push(ConfigProblem::Unconsumed(unused));
    }

    if !problems.is_empty() {
        return Err(ConfigError::Invalid(problems));
    }

    tracing::debug!(targets = targets.len(), "evaluated configuration");
    Ok(targets)
}

/// Resolve a target's `live_update` entries into declared steps, in order.
fn declare_target_steps(
    session: &mut DeclarationSession,
    named: &HashMap<&str, LiveUpdateStep>,
    source: &str,
    target_index: usize,
    target: &TargetConfig,
    problems: &mut Vec<ConfigProblem>,
) -> Vec<LiveUpdateStep> {
    let mut steps = Vec::with_capacity(target.live_update.len());

    for (j, entry) in target.live_update.iter().enumerate() {
        let position = DeclarationPos::new(
            source,
            format!("targets[{}].live_update[{}]", target_index, j),
        );
        match entry {
            StepEntry::Reference(name) => match named.get(name.as_str()) {
                Some(step) => steps.push(step.clone()),
                None if name == "restart_container" => {
                    steps.push(session.declare(StepSpec::RestartContainer, position));
                }
                None => problems.push(ConfigProblem::UnknownStep {
                    name: name.clone(),
                    position,
                }),
            },
            StepEntry::Inline(spec) => steps.push(session.declare(spec.clone(), position)),
        }
    }

    steps
}
