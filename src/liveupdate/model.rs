// ABOUTME: The validated, executable live-update plan.
// ABOUTME: Ordered fall-back, sync, run and restart steps plus their base directory.

use std::path::{Path, PathBuf};

use super::path_set::{PathSet, normalize};
use super::step::StepSpec;
use crate::types::{ChangeSet, ShellCommand};

/// Files whose change forces a full rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallBackOnStep {
    pub files: PathSet,
}

/// Copy `source` on the host to `dest` inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStep {
    pub source: PathBuf,
    pub dest: String,
}

impl SyncStep {
    /// Whether `path` is the synced file or lies inside the synced directory.
    pub fn covers(&self, path: &Path) -> bool {
        normalize(path).starts_with(&self.source)
    }
}

/// A command to run in the container when one of its triggers changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStep {
    pub command: ShellCommand,
    pub triggers: PathSet,
}

impl RunStep {
    /// Run steps without triggers fire on every update.
    pub fn should_run(&self, changes: &ChangeSet) -> bool {
        self.triggers.is_empty() || self.triggers.first_match(changes.iter()).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    FallBackOn(FallBackOnStep),
    Sync(SyncStep),
    Run(RunStep),
    RestartContainer,
}

/// Reasons a step list can't form a live update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanViolation {
    /// A restart step sits at this index but isn't the last step.
    RestartNotLast { index: usize },
}

/// An immutable, validated live-update plan.
///
/// Steps keep their declared order. Fall-back steps apply to the whole plan
/// wherever they appear; a restart step, if any, is last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveUpdate {
    steps: Vec<Step>,
    base_dir: PathBuf,
}

impl LiveUpdate {
    pub fn new(steps: Vec<Step>, base_dir: impl Into<PathBuf>) -> Result<Self, PlanViolation> {
        let last = steps.len().saturating_sub(1);
        if let Some(index) = steps
            .iter()
            .position(|s| matches!(s, Step::RestartContainer))
            .filter(|&i| i != last)
        {
            return Err(PlanViolation::RestartNotLast { index });
        }

        Ok(Self {
            steps,
            base_dir: base_dir.into(),
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn sync_steps(&self) -> impl Iterator<Item = &SyncStep> {
        self.steps.iter().filter_map(|s| match s {
            Step::Sync(sync) => Some(sync),
            _ => None,
        })
    }

    pub fn run_steps(&self) -> impl Iterator<Item = &RunStep> {
        self.steps.iter().filter_map(|s| match s {
            Step::Run(run) => Some(run),
            _ => None,
        })
    }

    pub fn should_restart(&self) -> bool {
        matches!(self.steps.last(), Some(Step::RestartContainer))
    }

    /// The first changed file that any fall-back step matches.
    pub fn fall_back_trigger<'a>(&self, changes: &'a ChangeSet) -> Option<&'a Path> {
        self.steps.iter().find_map(|s| match s {
            Step::FallBackOn(fb) => fb.files.first_match(changes.iter()),
            _ => None,
        })
    }

    /// The first changed file that no sync step copies into the container.
    pub fn unsynced_change<'a>(&self, changes: &'a ChangeSet) -> Option<&'a Path> {
        changes
            .iter()
            .find(|path| !self.sync_steps().any(|sync| sync.covers(path)))
    }

    /// Render the plan back into the step descriptions it was built from.
    pub fn describe(&self) -> Vec<StepSpec> {
        self.steps
            .iter()
            .map(|s| match s {
                Step::FallBackOn(fb) => StepSpec::FallBackOn(fb.files.patterns().to_vec()),
                Step::Sync(sync) => StepSpec::Sync {
                    local: sync.source.clone(),
                    remote: sync.dest.clone(),
                },
                Step::Run(run) => StepSpec::Run {
                    cmd: run.command.script().to_string(),
                    trigger: run.triggers.patterns().to_vec(),
                },
                Step::RestartContainer => StepSpec::RestartContainer,
            })
            .collect()
    }
}
