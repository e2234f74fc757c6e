// ABOUTME: Container runtime access: detection, collaborator traits and their adapters.
// ABOUTME: Bollard for Docker/Podman, CLI wrappers for compose and kubectl.

mod bollard;
mod compose;
mod detection;
pub mod error;
mod kubectl;
pub mod process;
pub mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use compose::ComposeCli;
pub use detection::{DetectionError, detect_runtime};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use kubectl::KubectlClient;
pub use types::{DetectedRuntime, RuntimeConfig, RuntimeType};
