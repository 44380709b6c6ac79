use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream};
use log::debug;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::error::{Result, UploadError};
use crate::local::LocalFileSystem;
use crate::upload::Encoding;

/// Ordered producer of byte chunks, consumed once.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Where the bytes of an upload come from.
pub enum UploadSource {
    /// Bytes already in memory
    Buffer(Bytes),
    /// A live producer. It is drained by exactly one upload.
    Stream(ByteStream),
    /// A local file, opened when the upload starts
    Path(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Buffer,
    Stream,
    Path,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Buffer => write!(f, "buffer"),
            SourceKind::Stream => write!(f, "stream"),
            SourceKind::Path => write!(f, "path"),
        }
    }
}

impl UploadSource {
    pub fn buffer(data: impl Into<Bytes>) -> Self {
        UploadSource::Buffer(data.into())
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        UploadSource::Stream(Box::pin(stream))
    }

    /// Adapt any async reader into a stream source, reading `chunk_size`
    /// bytes at a time.
    pub fn reader<R>(reader: R, chunk_size: usize) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        UploadSource::Stream(Box::pin(ReaderStream::with_capacity(reader, chunk_size)))
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        UploadSource::Path(path.into())
    }

    /// Build a buffer source from text in the given encoding.
    pub fn text(text: &str, encoding: Encoding) -> Result<Self> {
        Ok(UploadSource::Buffer(encoding.encode(text)?))
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            UploadSource::Buffer(_) => SourceKind::Buffer,
            UploadSource::Stream(_) => SourceKind::Stream,
            UploadSource::Path(_) => SourceKind::Path,
        }
    }

    /// Turn the source into a byte stream.
    ///
    /// Path sources are opened here, so a missing or unreadable file fails
    /// with [`UploadError::SourceNotFound`] before the caller touches the
    /// remote side.
    pub(crate) async fn resolve(
        self,
        local: &dyn LocalFileSystem,
        chunk_size: usize,
    ) -> Result<ResolvedSource> {
        match self {
            UploadSource::Buffer(data) => {
                let size = data.len() as u64;
                let chunk = Some(data).filter(|d| !d.is_empty()).map(Ok::<Bytes, io::Error>);
                Ok(ResolvedSource {
                    stream: Box::pin(stream::iter(chunk)),
                    size_hint: Some(size),
                })
            }
            UploadSource::Stream(stream) => Ok(ResolvedSource {
                stream,
                size_hint: None,
            }),
            UploadSource::Path(path) => {
                let opened = local
                    .open_readable(&path)
                    .await
                    .map_err(|e| UploadError::source_not_found(&path, &e))?;
                debug!(
                    "Opened local source {} ({:?} bytes)",
                    path.display(),
                    opened.size_hint
                );
                Ok(ResolvedSource {
                    stream: Box::pin(ReaderStream::with_capacity(opened.reader, chunk_size)),
                    size_hint: opened.size_hint,
                })
            }
        }
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadSource::Buffer(data) => f.debug_tuple("Buffer").field(&data.len()).finish(),
            UploadSource::Stream(_) => f.write_str("Stream(..)"),
            UploadSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

impl From<Bytes> for UploadSource {
    fn from(data: Bytes) -> Self {
        UploadSource::Buffer(data)
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(data: Vec<u8>) -> Self {
        UploadSource::Buffer(Bytes::from(data))
    }
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        UploadSource::Path(path)
    }
}

impl From<&Path> for UploadSource {
    fn from(path: &Path) -> Self {
        UploadSource::Path(path.to_path_buf())
    }
}

/// A source ready to be pumped.
pub(crate) struct ResolvedSource {
    pub stream: ByteStream,
    pub size_hint: Option<u64>,
}
