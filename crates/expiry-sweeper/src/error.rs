//! Error types for the expiry sweeper.

use std::path::PathBuf;

/// Result type for sweeper operations.
pub type Result<T> = std::result::Result<T, SweeperError>;

/// Errors that can occur while evaluating, sweeping or resolving paths.
#[derive(Debug, thiserror::Error)]
pub enum SweeperError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Path validation failed - potential security issue
    #[error("Path validation failed: {path:?} - {reason}")]
    PathValidation { path: PathBuf, reason: String },

    /// Path does not exist (may have been swept concurrently)
    #[error("Path not found: {path:?}")]
    NotFound { path: PathBuf },

    /// Walking the directory tree failed at the root
    #[error("Traversal of {root:?} failed: {reason}")]
    Traversal { root: PathBuf, reason: String },

    /// A scheduled sweep pass could not be completed
    #[error("Sweep pass failed: {reason}")]
    Scheduler { reason: String },
}

impl SweeperError {
    pub(crate) fn path_validation<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::PathValidation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a client mistake (bad path) rather than a server fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::PathValidation { .. })
    }
}
