//! Remote store abstraction.
//!
//! The [`Uploader`](crate::upload::Uploader) never talks to an SFTP server
//! directly. It goes through the [`RemoteConnection`] and [`RemoteFile`]
//! traits, so the same upload logic runs against a live server
//! ([`sftp::SftpConnection`]) or an in-memory store ([`memory::MemoryStore`]).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │    Uploader     │────▶│ RemoteConnection │
//! └─────────────────┘     └────────┬─────────┘
//!                                  │ open_write
//!                    ┌─────────────┴─────────────┐
//!                    │                           │
//!              ┌─────▼──────┐           ┌───────▼────────┐
//!              │  SftpFile  │           │   MemoryFile   │
//!              └─────┬──────┘           └───────┬────────┘
//!                    │                           │
//!              ┌─────▼──────┐           ┌───────▼────────┐
//!              │ SFTP Server│           │  MemoryStore   │
//!              └────────────┘           └────────────────┘
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::RemoteError;

/// In-memory remote store
pub mod memory;

/// ssh2 backed SFTP connection
pub mod sftp;

/// How an existing destination is treated when it is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Create the file or truncate it to zero length
    #[default]
    Overwrite,
    /// Create the file or append to its current end
    Append,
}

/// Options passed to [`RemoteConnection::open_write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub mode: WriteMode,
    pub permissions: i32,
}

/// Kind of object found at a remote path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Other,
}

/// Attributes of a remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileStat {
    pub size: u64,
    pub permissions: Option<u32>,
    pub modified: Option<DateTime<Utc>>,
    pub kind: FileKind,
}

impl RemoteFileStat {
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

/// A connection to a remote store that may be shared by many concurrent uploads.
///
/// Implementations must pass paths through unchanged: relative paths are
/// resolved by the remote side according to its own working directory.
#[async_trait]
pub trait RemoteConnection: Send + Sync {
    /// Human readable identifier for logs and errors
    fn describe(&self) -> String;

    /// Open `path` for writing. Fails if the parent directory does not exist.
    async fn open_write(
        &self,
        path: &str,
        options: &WriteOptions,
    ) -> Result<Box<dyn RemoteFile>, RemoteError>;

    /// Look up the attributes of `path`
    async fn stat(&self, path: &str) -> Result<RemoteFileStat, RemoteError>;
}

/// A remote file opened for writing.
#[async_trait]
pub trait RemoteFile: Send {
    /// Get the identifier of this target (for logs/errors)
    fn target_name(&self) -> String;

    /// Write one chunk. Returns once the remote side accepted it.
    async fn write(&mut self, chunk: Bytes) -> Result<(), RemoteError>;

    /// Close the file and wait for the remote acknowledgment.
    /// Returns the number of bytes written through this handle.
    async fn finalize(self: Box<Self>) -> Result<u64, RemoteError>;

    /// Release the handle without waiting for an acknowledgment
    async fn abort(self: Box<Self>);
}
