// ABOUTME: Where a live-update step was declared in the project configuration.
// ABOUTME: Used as the key of the declaration tracking set and in error messages.

use std::fmt;

/// A declaration site, rendered as `source:locator`.
///
/// `source` is the file the step came from and `locator` points inside it,
/// e.g. `hotpatch.yml:steps.sync-src` or `hotpatch.yml:targets[0].live_update[2]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclarationPos {
    source: String,
    locator: String,
}

impl DeclarationPos {
    pub fn new(source: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            locator: locator.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }
}

impl fmt::Display for DeclarationPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.locator)
    }
}
