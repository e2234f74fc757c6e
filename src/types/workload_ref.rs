// ABOUTME: Reference to a deployed workload: kind/name plus optional container.
// ABOUTME: Parsed from strings like deployment/web or statefulset/db.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkloadRefError {
    #[error("workload reference must be kind/name, got '{0}'")]
    Format(String),

    #[error("invalid character in workload reference: '{0}'")]
    InvalidChar(char),
}

/// Names the workload an update is aimed at.
///
/// `kind` and `name` follow the cluster's own vocabulary (`deployment/web`);
/// `container` picks one container inside a multi-container pod and defaults to
/// the first one when unset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkloadRef {
    kind: String,
    name: String,
    container: Option<String>,
}

impl WorkloadRef {
    pub fn parse(input: &str) -> Result<Self, WorkloadRefError> {
        let (kind, name) = input
            .trim()
            .split_once('/')
            .filter(|(k, n)| !k.is_empty() && !n.is_empty() && !n.contains('/'))
            .ok_or_else(|| WorkloadRefError::Format(input.to_string()))?;

        if let Some(c) = kind
            .chars()
            .chain(name.chars())
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '.'))
        {
            return Err(WorkloadRefError::InvalidChar(c));
        }

        Ok(Self {
            kind: kind.to_ascii_lowercase(),
            name: name.to_string(),
            container: None,
        })
    }

    /// Build from parts already known to be valid, such as a target name.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into().to_ascii_lowercase(),
            name: name.into(),
            container: None,
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }
}

impl FromStr for WorkloadRef {
    type Err = WorkloadRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)?;
        if let Some(ref container) = self.container {
            write!(f, "[{}]", container)?;
        }
        Ok(())
    }
}

impl serde::Serialize for WorkloadRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kind_and_name() {
        let w = WorkloadRef::parse("Deployment/web").unwrap();
        assert_eq!(w.kind(), "deployment");
        assert_eq!(w.name(), "web");
        assert_eq!(w.container(), None);
    }

    #[test]
    fn display_includes_container() {
        let w = WorkloadRef::parse("deployment/web")
            .unwrap()
            .with_container("app");
        assert_eq!(w.to_string(), "deployment/web[app]");
    }

    #[test]
    fn rejects_missing_kind() {
        assert!(WorkloadRef::parse("web").is_err());
        assert!(WorkloadRef::parse("/web").is_err());
        assert!(WorkloadRef::parse("a/b/c").is_err());
    }
}
