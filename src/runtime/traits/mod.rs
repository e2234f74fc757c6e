// ABOUTME: Collaborator traits the update strategies are written against.
// ABOUTME: ContainerOps, CopyOps, ExecOps, ImageBuilder, ClusterClient, ComposeClient, RuntimeInfo.

mod cluster;
mod compose;
mod container;
mod copy;
mod exec;
mod image;
mod runtime_info;
mod shared_types;

pub use cluster::{ClusterClient, ClusterError};
pub use compose::{ComposeClient, ComposeError};
pub use container::{ContainerError, ContainerOps};
pub use copy::{CopyError, CopyOps};
pub use exec::{ExecError, ExecOps};
pub use image::{ImageBuilder, ImageError};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Everything the container-patch strategy needs from a runtime.
pub trait ContainerRuntime: ContainerOps + CopyOps + ExecOps {}

impl<T: ContainerOps + CopyOps + ExecOps> ContainerRuntime for T {}
