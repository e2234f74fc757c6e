// ABOUTME: A shell command line to run inside a container.
// ABOUTME: Keeps the script text and renders the sh -c argv the runtime expects.

use std::fmt;

/// A command written the way a user would type it in a shell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShellCommand(String);

impl ShellCommand {
    pub fn new(script: impl Into<String>) -> Self {
        Self(script.into())
    }

    pub fn script(&self) -> &str {
        &self.0
    }

    /// The exec argv: `["sh", "-c", script]`.
    pub fn argv(&self) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), self.0.clone()]
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
