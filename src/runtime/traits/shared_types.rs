// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ExecResult, BuildContext, CacheKey and RuntimeMetadata.

use crate::types::ImageRef;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Grace period a container gets to stop before it is killed on restart.
pub const RESTART_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of an exec operation.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Exit code.
    pub exit_code: i64,
    /// Standard output.
    pub stdout: Vec<u8>,
    /// Standard error.
    pub stderr: Vec<u8>,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stderr as lossy UTF-8, trimmed, falling back to stdout when stderr is empty.
    pub fn diagnostic(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let text = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&self.stdout)
        } else {
            stderr
        };
        text.trim().to_string()
    }
}

/// Inputs to an image build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    /// Directory sent to the builder.
    pub context_dir: PathBuf,
    /// Dockerfile path, relative to the context.
    pub dockerfile: String,
    /// Build arguments.
    pub build_args: BTreeMap<String, String>,
}

/// Content-addressed key for an image build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Repository the image would be tagged into.
    pub repository: ImageRef,
    /// Hex fingerprint of the build inputs.
    pub digest: String,
}

impl CacheKey {
    /// The tag an image built for this key carries.
    pub fn image(&self) -> ImageRef {
        self.repository.with_tag(format!("hotpatch-{}", self.digest))
    }
}

/// What the daemon reported about itself.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    pub name: String,
    pub version: String,
    pub arch: String,
}
