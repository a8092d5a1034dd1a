//! Error types for the transfer engine and its remote filesystem seam.

/// Errors returned by a [`RemoteFs`](crate::RemoteFs) implementation.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("no such file: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Returns `true` if the error means the target already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, RemoteError::AlreadyExists(_))
    }
}

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("cannot list {path}: {reason}")]
    Listing { path: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("integrity mismatch on {path}: transferred {transferred}, stored {stored}")]
    IntegrityMismatch {
        path: String,
        transferred: String,
        stored: String,
    },

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cannot delete {path}: {reason}")]
    Deletion { path: String, reason: String },

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl TransferError {
    pub(crate) fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        TransferError::Io {
            path: path.to_string(),
            source,
        }
    }
}
