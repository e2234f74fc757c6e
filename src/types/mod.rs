// ABOUTME: Validated domain types shared by the build engine and adapters.
// ABOUTME: Container IDs, image references, target and workload names.

mod change_set;
mod id;
mod image_ref;
mod shell_command;
mod target_name;
mod workload_ref;

pub use change_set::ChangeSet;
pub use id::ContainerId;
pub use image_ref::{ImageRef, ParseImageRefError};
pub use shell_command::ShellCommand;
pub use target_name::{TargetName, TargetNameError};
pub use workload_ref::{WorkloadRef, WorkloadRefError};
