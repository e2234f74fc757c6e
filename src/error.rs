// ABOUTME: Application-wide error types for hotpatch.
// ABOUTME: Wraps each module's error so commands can use `?` throughout.

use thiserror::Error;

use crate::build::{DispatchError, OrderError};
use crate::config::ConfigError;
use crate::runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("unknown target: {0}")]
    UnknownTarget(String),

    #[error("no changed paths given")]
    NoChanges,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
