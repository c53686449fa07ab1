//! Shared error and result types used across the storage and query layers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias over [`TriqError`].
pub type Result<T> = std::result::Result<T, TriqError>;

/// Errors surfaced by stores and by the reference query engine internals.
#[derive(Debug, Error)]
pub enum TriqError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A write was attempted against a store opened read-only.
    #[error("store '{0}' is read-only")]
    ReadOnly(String),
    /// A seed file could not be parsed.
    #[error("{path}:{line}: {message}")]
    Seed {
        /// Seed file path.
        path: PathBuf,
        /// 1-based line number of the offending entry.
        line: usize,
        /// Parser diagnostic.
        message: String,
    },
    /// The tracing subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}
