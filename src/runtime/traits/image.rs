// ABOUTME: Image build, cache lookup and push operations.
// ABOUTME: The image-build strategy's view of whatever builds container images.

use super::shared_types::{BuildContext, CacheKey};
use crate::types::ImageRef;
use async_trait::async_trait;

/// Builds images from a local source tree.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Build the context and tag the result as `tag`.
    async fn build(&self, context: &BuildContext, tag: &ImageRef) -> Result<ImageRef, ImageError>;

    /// An image already built for these exact inputs, if one is available.
    async fn cache_lookup(&self, key: &CacheKey) -> Result<Option<ImageRef>, ImageError> {
        let _ = key;
        Ok(None)
    }

    /// Push a built image to its registry.
    async fn push(&self, image: &ImageRef) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to prepare build context {path}: {message}")]
    Context { path: String, message: String },

    #[error("build failed for {image}: {message}")]
    BuildFailed { image: String, message: String },

    #[error("push failed for {image}: {message}")]
    PushFailed { image: String, message: String },

    #[error("runtime error: {0}")]
    Runtime(String),
}
