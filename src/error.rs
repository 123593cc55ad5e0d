//! Error types for the roki wiki publisher.

use thiserror::Error;

/// Filesystem and object-store errors
#[derive(Debug, Error)]
pub enum FsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected type at {path}: expected {expected}, found {found}")]
    UnexpectedType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Tree listing was truncated by the remote store: {0}")]
    TruncatedListing(String),

    #[error("Unsupported blob encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Filesystem I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// Shorthand for a directory-expected-but-file-found error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        FsError::UnexpectedType {
            path: path.into(),
            expected: "directory",
            found: "file",
        }
    }

    /// Shorthand for a file-expected-but-directory-found error.
    pub fn not_a_file(path: impl Into<String>) -> Self {
        FsError::UnexpectedType {
            path: path.into(),
            expected: "file",
            found: "directory",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

/// Orchestration-level errors
#[derive(Debug, Error)]
pub enum RokiError {
    #[error(transparent)]
    Filesystem(#[from] FsError),

    #[error("Invalid revision {path}: {reason}")]
    InvalidRevision { path: String, reason: String },

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Theme error: {0}")]
    Theme(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for RokiError {
    fn from(err: config::ConfigError) -> Self {
        RokiError::Config(err.to_string())
    }
}

impl From<tera::Error> for RokiError {
    fn from(err: tera::Error) -> Self {
        RokiError::Template(err.to_string())
    }
}
