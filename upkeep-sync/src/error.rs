//! Error types for upkeep-sync.

use std::path::PathBuf;

use thiserror::Error;

use upkeep_core::CoreError;

/// All errors that can arise from sync operations.
///
/// Fetch failures are deliberately absent: they collapse into
/// [`crate::FetchResult::Absent`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration, addressing or version-gating error from upkeep-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A backup, temp-file write or rename failed, with annotated path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
