//! Error types for memfs_core.

use thiserror::Error;

/// Result type alias using memfs_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during filesystem operations.
///
/// Every operation validates before it mutates, so returning any of these
/// leaves the tree exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A path component or entry name does not exist.
    #[error("No such file or directory: {path}")]
    NotFound { path: String },

    /// The name is already taken in the target directory.
    #[error("File exists: {name}")]
    AlreadyExists { name: String },

    /// A directory was required but something else was found.
    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    /// The object does not implement the requested capability.
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    /// Malformed path or entry name.
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Directory still holds entries besides "." and "..".
    #[error("Directory not empty: {path}")]
    NotEmpty { path: String },

    /// The requested logical size exceeds what a file may hold.
    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    /// Configuration could not be parsed.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Error::NotFound { path: path.into() }
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(name: impl Into<String>) -> Self {
        Error::AlreadyExists { name: name.into() }
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Error::NotADirectory { path: path.into() }
    }

    /// Create a TypeMismatch error.
    pub fn type_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a NotEmpty error.
    pub fn not_empty(path: impl Into<String>) -> Self {
        Error::NotEmpty { path: path.into() }
    }

    /// Create a FileTooLarge error.
    pub fn file_too_large(size: u64, limit: u64) -> Self {
        Error::FileTooLarge { size, limit }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// POSIX errno equivalent, for adapters that report numeric status codes.
    pub fn errno(&self) -> i32 {
        match self {
            Error::NotFound { .. } => 2, // ENOENT
            Error::AlreadyExists { .. } => 17, // EEXIST
            Error::NotADirectory { .. } => 20, // ENOTDIR
            Error::TypeMismatch { .. } => 21, // EISDIR
            Error::InvalidPath { .. } => 22, // EINVAL
            Error::NotEmpty { .. } => 39, // ENOTEMPTY
            Error::FileTooLarge { .. } => 27, // EFBIG
            Error::InvalidConfig { .. } => 22, // EINVAL
        }
    }
}
