//! Error types for the catalog

use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur when talking to the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Study not registered
    #[error("Study not found: {0}")]
    StudyNotFound(String),

    /// Job not registered
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// File or folder not registered
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Path is already registered
    #[error("File already exists: {0}")]
    AlreadyExists(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// User has no credential
    #[error("No token available for user '{0}'")]
    NoToken(String),

    /// Filesystem access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be read or written
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl CatalogError {
    /// Check if this error means the requested entity does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::StudyNotFound(_) | Self::JobNotFound(_) | Self::FileNotFound(_)
        )
    }
}
