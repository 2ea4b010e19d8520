//! Error types for fact gathering.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fact gathering.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while gathering platform facts.
#[derive(Debug, Error)]
pub enum Error {
    /// A fact source exists but could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The os-release file has no `ID` field
    #[error("{path} does not name a platform (missing ID)")]
    MissingPlatformId { path: PathBuf },

    /// A `--fact` style override was not `key=value`
    #[error("invalid fact override `{0}` (expected key=value)")]
    InvalidOverride(String),
}
