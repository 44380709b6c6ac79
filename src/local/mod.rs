//! Local filesystem access for path sources.

use std::fmt;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncRead;

/// An opened local source.
pub struct ReadableSource {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    /// Size of the file when it was opened, if known
    pub size_hint: Option<u64>,
}

impl fmt::Debug for ReadableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadableSource")
            .field("size_hint", &self.size_hint)
            .finish_non_exhaustive()
    }
}

/// Opens local files on behalf of the uploader.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocalFileSystem: Send + Sync {
    /// Open `path` for reading. Only regular files are readable sources.
    async fn open_readable(&self, path: &Path) -> io::Result<ReadableSource>;

    /// Size in bytes of the regular file at `path`
    async fn stat_size(&self, path: &Path) -> io::Result<u64>;
}

/// [`LocalFileSystem`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

fn not_a_file(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{} is not a regular file", path.display()),
    )
}

#[async_trait]
impl LocalFileSystem for TokioFileSystem {
    async fn open_readable(&self, path: &Path) -> io::Result<ReadableSource> {
        let file = tokio::fs::File::open(path).await?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(not_a_file(path));
        }

        Ok(ReadableSource {
            reader: Box::new(file),
            size_hint: Some(metadata.len()),
        })
    }

    async fn stat_size(&self, path: &Path) -> io::Result<u64> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(not_a_file(path));
        }
        Ok(metadata.len())
    }
}
