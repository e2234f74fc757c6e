// ABOUTME: One configuration-evaluation pass over live-update step declarations.
// ABOUTME: Tracks declared steps until a live update consumes them, then checks none were left over.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use super::error::{LiveUpdateError, StepError};
use super::model::{FallBackOnStep, LiveUpdate, PlanViolation, RunStep, Step, SyncStep};
use super::path_set::{PathSet, normalize};
use super::position::DeclarationPos;
use super::step::{LiveUpdateStep, StepSpec};
use crate::types::ShellCommand;

/// Owns the declaration tracking set for a single evaluation of the project
/// configuration.
///
/// Every declared step is recorded under its position. Converting a step list
/// into a [`LiveUpdate`] removes those steps from the set; whatever is still in
/// the set when [`validate_all_consumed`](Self::validate_all_consumed) runs was
/// created but never attached to a live update.
#[derive(Debug)]
pub struct DeclarationSession {
    base_dir: PathBuf,
    declared: HashSet<DeclarationPos>,
    unconsumed: BTreeMap<DeclarationPos, LiveUpdateStep>,
}

impl DeclarationSession {
    /// Start a session. Relative sync sources and trigger patterns resolve
    /// against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            declared: HashSet::new(),
            unconsumed: BTreeMap::new(),
        }
    }

    pub fn base_dir(&self) -> &std::path::Path {
        &self.base_dir
    }

    /// Declare a step and record it as not yet used.
    pub fn declare(&mut self, spec: StepSpec, position: DeclarationPos) -> LiveUpdateStep {
        let spec = match spec {
            StepSpec::Sync { local, remote } => StepSpec::Sync {
                local: normalize(&self.base_dir.join(local)),
                remote,
            },
            other => other,
        };

        tracing::trace!(%position, step = %spec, "declared live_update step");
        let step = LiveUpdateStep::new(spec, position.clone());
        self.declared.insert(position.clone());
        self.unconsumed.insert(position, step.clone());
        step
    }

    pub fn fall_back_on(&mut self, files: Vec<String>, position: DeclarationPos) -> LiveUpdateStep {
        self.declare(StepSpec::FallBackOn(files), position)
    }

    pub fn sync(
        &mut self,
        local: impl Into<PathBuf>,
        remote: impl Into<String>,
        position: DeclarationPos,
    ) -> LiveUpdateStep {
        self.declare(
            StepSpec::Sync {
                local: local.into(),
                remote: remote.into(),
            },
            position,
        )
    }

    pub fn run(
        &mut self,
        cmd: impl Into<String>,
        triggers: Vec<String>,
        position: DeclarationPos,
    ) -> LiveUpdateStep {
        self.declare(
            StepSpec::Run {
                cmd: cmd.into(),
                trigger: triggers,
            },
            position,
        )
    }

    pub fn restart_container(&mut self, position: DeclarationPos) -> LiveUpdateStep {
        self.declare(StepSpec::RestartContainer, position)
    }

    /// Steps declared so far that no live update has consumed.
    pub fn unconsumed(&self) -> impl Iterator<Item = &LiveUpdateStep> {
        self.unconsumed.values()
    }

    /// Convert an ordered list of declared steps into a validated live update.
    ///
    /// Every step handed in is consumed, valid or not. All problems in the
    /// list are reported at once.
    pub fn convert(&mut self, steps: &[LiveUpdateStep]) -> Result<LiveUpdate, LiveUpdateError> {
        let mut model = Vec::with_capacity(steps.len());
        let mut errors = Vec::new();
        let last = steps.len().saturating_sub(1);

        for (index, step) in steps.iter().enumerate() {
            if !self.declared.contains(step.position()) {
                errors.push(StepError::Undeclared {
                    step: step.to_string(),
                    type_name: step.spec().type_name(),
                    position: step.position().clone(),
                });
                continue;
            }
            self.unconsumed.remove(step.position());

            if matches!(step.spec(), StepSpec::RestartContainer) && index != last {
                errors.push(StepError::RestartNotLast {
                    position: step.position().clone(),
                });
                continue;
            }

            match self.to_model(step) {
                Ok(m) => model.push(m),
                Err(e) => errors.push(e),
            }
        }

        if !errors.is_empty() {
            return Err(LiveUpdateError::new(errors));
        }

        LiveUpdate::new(model, self.base_dir.clone()).map_err(|violation| {
            let PlanViolation::RestartNotLast { index } = violation;
            let position = steps
                .get(index)
                .map(|s| s.position().clone())
                .unwrap_or_else(|| DeclarationPos::new("<unknown>", index.to_string()));
            LiveUpdateError::new(vec![StepError::RestartNotLast { position }])
        })
    }

    fn to_model(&self, step: &LiveUpdateStep) -> Result<Step, StepError> {
        let position = step.position();
        match step.spec() {
            StepSpec::FallBackOn(files) => Ok(Step::FallBackOn(FallBackOnStep {
                files: self.path_set(files, position)?,
            })),
            StepSpec::Sync { local, remote } => {
                if !remote.starts_with('/') {
                    return Err(StepError::RelativeSyncDestination {
                        remote: remote.clone(),
                        position: position.clone(),
                    });
                }
                Ok(Step::Sync(SyncStep {
                    source: local.clone(),
                    dest: remote.clone(),
                }))
            }
            StepSpec::Run { cmd, trigger } => Ok(Step::Run(RunStep {
                command: ShellCommand::new(cmd.clone()),
                triggers: self.path_set(trigger, position)?,
            })),
            StepSpec::RestartContainer => Ok(Step::RestartContainer),
        }
    }

    fn path_set(&self, patterns: &[String], position: &DeclarationPos) -> Result<PathSet, StepError> {
        PathSet::new(patterns.to_vec(), self.base_dir.clone()).map_err(|source| {
            StepError::InvalidPattern {
                pattern: source_pattern(patterns, &source),
                position: position.clone(),
                source,
            }
        })
    }

    /// Finish the session, failing if any declared step was never used.
    pub fn validate_all_consumed(self) -> Result<(), LiveUpdateError> {
        if self.unconsumed.is_empty() {
            return Ok(());
        }

        let errors = self
            .unconsumed
            .into_values()
            .map(|step| StepError::Unconsumed {
                step: step.to_string(),
                type_name: step.spec().type_name(),
                position: step.position().clone(),
            })
            .collect();
        Err(LiveUpdateError::new(errors))
    }
}

/// Best guess at which pattern a glob error came from.
fn source_pattern(patterns: &[String], err: &glob::PatternError) -> String {
    patterns
        .iter()
        .find(|p| glob::Pattern::new(p).is_err())
        .cloned()
        .unwrap_or_else(|| err.msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(n: u32) -> DeclarationPos {
        DeclarationPos::new("hotpatch.yml", format!("steps.s{}", n))
    }

    #[test]
    fn relative_sync_source_resolves_against_base() {
        let mut session = DeclarationSession::new("/project");
        let step = session.sync("./src/../app", "/app", pos(1));
        assert_eq!(
            step.spec(),
            &StepSpec::Sync {
                local: PathBuf::from("/project/app"),
                remote: "/app".to_string(),
            }
        );
    }

    #[test]
    fn convert_consumes_even_invalid_steps() {
        let mut session = DeclarationSession::new("/project");
        let bad = session.sync("src", "app", pos(1));
        assert!(session.convert(&[bad]).is_err());
        assert!(session.validate_all_consumed().is_ok());
    }

    #[test]
    fn reports_every_invalid_step() {
        let mut session = DeclarationSession::new("/project");
        let a = session.sync("a", "rel/a", pos(1));
        let b = session.sync("b", "rel/b", pos(2));
        let err = session.convert(&[a, b]).unwrap_err();
        let positions: Vec<_> = err.positions().cloned().collect();
        assert_eq!(positions, vec![pos(1), pos(2)]);
    }

    #[test]
    fn step_from_another_session_is_an_internal_error() {
        let mut other = DeclarationSession::new("/project");
        let foreign = other.restart_container(pos(9));

        let mut session = DeclarationSession::new("/project");
        let err = session.convert(&[foreign]).unwrap_err();
        assert!(err.errors()[0].is_internal());
        assert!(err.to_string().contains("internal error"));
    }

    #[test]
    fn restart_before_sync_is_rejected_with_position() {
        let mut session = DeclarationSession::new("/project");
        let restart = session.restart_container(pos(1));
        let sync = session.sync("src", "/app/src", pos(2));
        let err = session.convert(&[restart, sync]).unwrap_err();
        assert!(matches!(
            &err.errors()[0],
            StepError::RestartNotLast { position } if *position == pos(1)
        ));
    }

    #[test]
    fn bad_trigger_glob_is_reported() {
        let mut session = DeclarationSession::new("/project");
        let run = session.run("make", vec!["src/[".to_string()], pos(1));
        let err = session.convert(&[run]).unwrap_err();
        assert!(matches!(
            &err.errors()[0],
            StepError::InvalidPattern { pattern, .. } if pattern == "src/["
        ));
    }

    #[test]
    fn a_step_may_feed_two_live_updates() {
        let mut session = DeclarationSession::new("/project");
        let sync = session.sync("src", "/app/src", pos(1));
        assert!(session.convert(std::slice::from_ref(&sync)).is_ok());
        assert!(session.convert(&[sync]).is_ok());
        assert!(session.validate_all_consumed().is_ok());
    }
}
