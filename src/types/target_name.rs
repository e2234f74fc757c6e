// ABOUTME: Validated target names used as lock keys and container labels.
// ABOUTME: Names follow RFC 1123 label rules so they are safe in labels and tags.

use serde::{Deserialize, Deserializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetNameError {
    #[error("target name cannot be empty")]
    Empty,

    #[error("target name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("target name cannot start or end with a hyphen")]
    EdgeHyphen,

    #[error("target name must be lowercase")]
    NotLowercase,

    #[error("invalid character in target name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetName(String);

impl TargetName {
    pub fn new(value: &str) -> Result<Self, TargetNameError> {
        if value.is_empty() {
            return Err(TargetNameError::Empty);
        }
        if value.len() > 63 {
            return Err(TargetNameError::TooLong);
        }
        if value.starts_with('-') || value.ends_with('-') {
            return Err(TargetNameError::EdgeHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(TargetNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(TargetNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for TargetName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TargetName::new(&s).map_err(serde::de::Error::custom)
    }
}

impl serde::Serialize for TargetName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
