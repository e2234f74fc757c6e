// ABOUTME: The build-and-deploy decision engine.
// ABOUTME: Strategies, their ordering, and the dispatcher that falls through between them.

mod composite;
mod compose_build;
mod container_patch;
mod image_build;
mod lock;
mod order;
mod result;
mod strategy;
mod target;

pub use composite::{CompositeBuildAndDeployer, DispatchError, DispatchReport, RedirectRecord};
pub use compose_build::ComposeBuildStrategy;
pub use container_patch::ContainerPatchStrategy;
pub use image_build::ImageBuildStrategy;
pub use lock::{TargetLock, TargetLocks};
pub use order::{
    BuildOrder, ClusterLocation, DeployKind, Environment, OrderError, Strategies, UpdateMode,
};
pub use result::{
    BuildError, BuildOutcome, BuildResult, Deployed, RedirectReason, StrategyKind, SyncRecord,
};
pub use strategy::BuildAndDeployer;
pub use target::{BuildTarget, ImageSpec};
