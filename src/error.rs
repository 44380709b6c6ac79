//! Error types for upload operations.
//!
//! Every failure of [`Uploader::put`](crate::upload::Uploader::put) is reported as
//! one of the [`UploadError`] variants so callers can tell a missing local file
//! from a bad remote directory or a transfer that broke half way.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for upload operations
pub type Result<T> = std::result::Result<T, UploadError>;

/// Classification of failures reported by a remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The path (or one of its parents) does not exist
    NoSuchFile,
    /// The server refused access
    PermissionDenied,
    /// Generic server-side failure
    Failure,
    /// The underlying connection went away
    ConnectionLost,
    /// Anything else
    Other,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteErrorKind::NoSuchFile => write!(f, "no such file"),
            RemoteErrorKind::PermissionDenied => write!(f, "permission denied"),
            RemoteErrorKind::Failure => write!(f, "failure"),
            RemoteErrorKind::ConnectionLost => write!(f, "connection lost"),
            RemoteErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Error returned by a [`RemoteConnection`](crate::remote::RemoteConnection)
/// or one of its open files.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn no_such_file(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NoSuchFile, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Failure, message)
    }

    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::ConnectionLost, message)
    }
}

impl From<io::Error> for RemoteError {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => RemoteErrorKind::NoSuchFile,
            io::ErrorKind::PermissionDenied => RemoteErrorKind::PermissionDenied,
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::TimedOut => RemoteErrorKind::ConnectionLost,
            _ => RemoteErrorKind::Failure,
        };
        Self::new(kind, err.to_string())
    }
}

/// Failure of a single `put` call.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The local source could not be opened. Raised before any remote call.
    #[error("put: source not found: {}: {reason}", .path.display())]
    SourceNotFound { path: PathBuf, reason: String },

    /// The remote store refused to open the destination for writing.
    #[error("put: destination unreachable: {path}: {cause}")]
    DestinationUnreachable {
        path: String,
        #[source]
        cause: RemoteError,
    },

    /// The byte transfer was interrupted. Remote content is undefined.
    #[error("put: transfer to {path} failed after {bytes_transferred} bytes: {reason}")]
    TransferFailure {
        path: String,
        bytes_transferred: u64,
        reason: String,
    },

    /// The call was rejected before any I/O took place.
    #[error("put: invalid options: {reason}")]
    InvalidOptions { reason: String },
}

impl UploadError {
    pub fn source_not_found(path: &Path, err: &io::Error) -> Self {
        UploadError::SourceNotFound {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    pub fn destination_unreachable(path: &str, cause: RemoteError) -> Self {
        UploadError::DestinationUnreachable {
            path: path.to_string(),
            cause,
        }
    }

    pub fn transfer_failure(path: &str, bytes_transferred: u64, reason: impl Into<String>) -> Self {
        UploadError::TransferFailure {
            path: path.to_string(),
            bytes_transferred,
            reason: reason.into(),
        }
    }

    pub fn invalid_options(reason: impl Into<String>) -> Self {
        UploadError::InvalidOptions {
            reason: reason.into(),
        }
    }

    /// Whether the failed call left no remote state behind, so that running
    /// the same `put` again from scratch is safe.
    pub fn is_retry_safe(&self) -> bool {
        !matches!(self, UploadError::TransferFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_not_found_message_keeps_os_text() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "No such file or directory (os error 2)");
        let err = UploadError::source_not_found(Path::new("/tmp/no-such-file.txt"), &io_err);

        let message = err.to_string();
        assert!(message.contains("/tmp/no-such-file.txt"));
        assert!(message.contains("No such file or directory"));
        assert!(err.is_retry_safe());
    }

    #[test]
    fn test_destination_unreachable_exposes_cause() {
        let err = UploadError::destination_unreachable(
            "/upload/bad-directory/bad-file.txt",
            RemoteError::no_such_file("No such file"),
        );

        assert!(err.to_string().contains("No such file"));
        match &err {
            UploadError::DestinationUnreachable { cause, .. } => {
                assert_eq!(cause.kind, RemoteErrorKind::NoSuchFile);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_transfer_failure_is_not_retry_safe() {
        let err = UploadError::transfer_failure("/upload/file.bin", 4096, "connection reset");
        assert!(!err.is_retry_safe());
        assert!(err.to_string().contains("4096 bytes"));
    }

    #[test]
    fn test_remote_error_from_io_kind() {
        let err: RemoteError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.kind, RemoteErrorKind::PermissionDenied);

        let err: RemoteError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert_eq!(err.kind, RemoteErrorKind::ConnectionLost);
    }
}
