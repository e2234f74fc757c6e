// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles image refs, workload refs, and the non-empty target list.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::TargetConfig;
use crate::types::{ImageRef, WorkloadRef};

pub fn deserialize_image_ref_option<'de, D>(deserializer: D) -> Result<Option<ImageRef>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    opt.map(|s| ImageRef::parse(&s).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_workload_ref_option<'de, D>(
    deserializer: D,
) -> Result<Option<WorkloadRef>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    opt.map(|s| WorkloadRef::parse(&s).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_targets<'de, D>(deserializer: D) -> Result<NonEmpty<TargetConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let targets: Vec<TargetConfig> = Vec::deserialize(deserializer)?;
    NonEmpty::from_vec(targets)
        .ok_or_else(|| serde::de::Error::custom("at least one target is required"))
}
