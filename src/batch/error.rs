use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::TriqError;

/// Fatal preconditions that stop a run before any statement executes.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The script could not be read.
    #[error("failed to read script {path}: {source}")]
    Source {
        /// Script path as given.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The store could not be obtained or prepared.
    #[error("failed to prepare store: {0}")]
    Store(#[from] TriqError),
}

/// Result type alias for batch setup.
pub type Result<T> = std::result::Result<T, BatchError>;

impl BatchError {
    pub(crate) fn source_failure(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        BatchError::Source {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Rejected `--channel_size` value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "channel size must be a non-negative integer no greater than {} (got '{value}')",
    crate::batch::ChannelSize::MAX_CAPACITY
)]
pub struct ChannelSizeError {
    /// The offending input.
    pub value: String,
}
