//! VFS Error Types

use thiserror::Error;

/// Result type for VFS operations
pub type VfsResult<T> = Result<T, VfsError>;

/// Error type for VFS operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VfsError {
    /// File not found
    #[error("Path not found: {path}")]
    NotFound { path: String },

    /// Path escapes the sandbox or is otherwise refused
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    /// Contents are not valid UTF-8
    #[error("Invalid UTF-8 in '{path}'")]
    InvalidUtf8 { path: String },

    /// IO error
    #[error("IO error: {message}")]
    Io { message: String },
}

impl From<std::io::Error> for VfsError {
    fn from(err: std::io::Error) -> Self {
        VfsError::Io {
            message: err.to_string(),
        }
    }
}
