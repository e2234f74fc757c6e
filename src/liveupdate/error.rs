// ABOUTME: Configuration-time errors for live-update steps.
// ABOUTME: Every offending step is reported with its declaration position.

use std::fmt;

use super::position::DeclarationPos;

/// A single step that failed validation.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("sync destination '{remote}' ({position}) is not absolute")]
    RelativeSyncDestination {
        remote: String,
        position: DeclarationPos,
    },

    #[error("invalid path pattern '{pattern}' ({position}): {source}")]
    InvalidPattern {
        pattern: String,
        position: DeclarationPos,
        #[source]
        source: glob::PatternError,
    },

    #[error("restart_container step ({position}) must be the last step in a live_update")]
    RestartNotLast { position: DeclarationPos },

    #[error("internal error - {step} of type '{type_name}', declared at {position}, was never recorded as declared")]
    Undeclared {
        step: String,
        type_name: &'static str,
        position: DeclarationPos,
    },

    #[error("value '{step}' of type '{type_name}' declared at {position}")]
    Unconsumed {
        step: String,
        type_name: &'static str,
        position: DeclarationPos,
    },
}

impl StepError {
    pub fn position(&self) -> &DeclarationPos {
        match self {
            StepError::RelativeSyncDestination { position, .. }
            | StepError::InvalidPattern { position, .. }
            | StepError::RestartNotLast { position }
            | StepError::Undeclared { position, .. }
            | StepError::Unconsumed { position, .. } => position,
        }
    }

    /// True for errors that point at a bug in the declaring code rather than
    /// at the user's configuration.
    pub fn is_internal(&self) -> bool {
        matches!(self, StepError::Undeclared { .. })
    }
}

/// All step errors found in one pass, reported together.
#[derive(Debug, thiserror::Error)]
pub struct LiveUpdateError {
    errors: Vec<StepError>,
}

impl LiveUpdateError {
    pub(crate) fn new(errors: Vec<StepError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[StepError] {
        &self.errors
    }

    pub fn positions(&self) -> impl Iterator<Item = &DeclarationPos> {
        self.errors.iter().map(StepError::position)
    }

    pub fn into_errors(self) -> Vec<StepError> {
        self.errors
    }
}

impl fmt::Display for LiveUpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unconsumed = self
            .errors
            .iter()
            .all(|e| matches!(e, StepError::Unconsumed { .. }));

        if unconsumed {
            write!(
                f,
                "found {} live_update steps that were created but not used in a live_update:",
                self.errors.len()
            )?;
        } else {
            write!(f, "found {} invalid live_update steps:", self.errors.len())?;
        }

        for err in &self.errors {
            write!(f, "\n\t{}", err)?;
        }
        Ok(())
    }
}
