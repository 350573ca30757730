//! Error types for buildward-util.

/// Errors produced by utility functions.
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    /// An I/O operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A glob pattern was invalid.
    #[error("invalid glob pattern `{pattern}`: {message}")]
    GlobPattern { pattern: String, message: String },

    /// A zip archive could not be written or read back.
    #[error("invalid archive {path}: {message}")]
    Archive { path: String, message: String },

    /// A name cannot be used as a single path component.
    #[error("invalid name \"{name}\": {reason}")]
    InvalidName { name: String, reason: String },
}
