use crate::cache::{CacheError, TreeError};
use crate::path::PathError;
use crate::remote::RemoteError;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("not found: {0}")]
    NotFound(String),
    /// The remote changed underneath a write; reload and retry
    #[error("conflict: {0} was modified remotely, pull the latest version before saving")]
    Conflict(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The cache broke one of its own invariants
    #[error("structural error: {0}")]
    Structural(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("is a directory: {0}")]
    IsADirectory(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("cancelled: {0}")]
    Cancelled(String),
    #[error("remote error: {0}")]
    Remote(RemoteError),
}

impl FsError {
    /// The one recoverable failure: the caller can reload and try again
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<RemoteError> for FsError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unauthorized(message) => Self::Unauthorized(message),
            RemoteError::NotFound(what) => Self::NotFound(what),
            RemoteError::StaleModification(id) => Self::Conflict(format!("asset {id}")),
            other => Self::Remote(other),
        }
    }
}

impl From<PathError> for FsError {
    fn from(err: PathError) -> Self {
        if err.is_structural() {
            return Self::Structural(err.to_string());
        }
        match err {
            PathError::InvalidPath(path) => Self::InvalidPath(path),
            PathError::ProjectNotFound(name) => Self::NotFound(format!("project {name}")),
            PathError::AssetNotFound(path) => Self::NotFound(path),
            PathError::NotADirectory(path) => Self::NotADirectory(path),
            other => Self::Structural(other.to_string()),
        }
    }
}

impl From<TreeError> for FsError {
    fn from(err: TreeError) -> Self {
        Self::Structural(err.to_string())
    }
}

impl From<CacheError> for FsError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::BranchNotFound { project, branch } => {
                Self::NotFound(format!("branch '{branch}' in project {project}"))
            }
        }
    }
}
