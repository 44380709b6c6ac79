use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use log::{debug, info, warn};
use tokio::time::timeout;

use crate::error::{RemoteError, Result, UploadError};
use crate::local::{LocalFileSystem, TokioFileSystem};
use crate::remote::{RemoteConnection, RemoteFile, RemoteFileStat, WriteMode};
use crate::security::path_validator::validate_destination;
use crate::upload::options::ProgressCallback;
use crate::upload::source::ByteStream;
use crate::upload::{ProgressTracker, UploadOptions, UploadProgress, UploadSource};

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub destination: String,
    /// Bytes acknowledged by the remote side
    pub bytes_transferred: u64,
    pub elapsed: Duration,
}

/// Uploads sources to a remote store.
///
/// Cloning is cheap and every clone shares the same connection, so many
/// uploads can run concurrently. The uploader never closes the connection.
#[derive(Clone)]
pub struct Uploader {
    remote: Arc<dyn RemoteConnection>,
    local: Arc<dyn LocalFileSystem>,
}

impl Uploader {
    pub fn new(remote: Arc<dyn RemoteConnection>) -> Self {
        Self::with_local_fs(remote, Arc::new(TokioFileSystem))
    }

    pub fn with_local_fs(remote: Arc<dyn RemoteConnection>, local: Arc<dyn LocalFileSystem>) -> Self {
        Self { remote, local }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteConnection> {
        &self.remote
    }

    /// Upload `source` to `destination`.
    ///
    /// The source is resolved before the remote side is contacted, so a
    /// missing local file never creates or truncates anything remotely.
    /// `Ok` is returned only after the remote side acknowledged the close of
    /// the destination file.
    pub async fn put(
        &self,
        source: UploadSource,
        destination: &str,
        options: UploadOptions,
    ) -> Result<Completion> {
        let started = Instant::now();

        options.validate()?;
        validate_destination(destination)
            .map_err(|e| UploadError::invalid_options(e.to_string()))?;

        debug!("Uploading {} source to {}", source.kind(), destination);
        let resolved = source.resolve(self.local.as_ref(), options.chunk_size).await?;

        let mut target = self
            .remote
            .open_write(destination, &options.write_options())
            .await
            .map_err(|e| {
                warn!("Cannot open {} on {}: {}", destination, self.remote.describe(), e);
                UploadError::destination_unreachable(destination, e)
            })?;

        let counter = Arc::new(AtomicU64::new(0));
        let tracker = ProgressTracker::new(
            target.target_name(),
            resolved.size_hint,
            Arc::clone(&counter),
        )
        .start_tracking();

        let pumping = pump(
            resolved.stream,
            target.as_mut(),
            &counter,
            resolved.size_hint,
            options.on_progress.as_ref(),
        );
        let pumped = match options.timeout {
            Some(limit) => match timeout(limit, pumping).await {
                Ok(result) => result,
                Err(_) => Err(format!("timed out after {:?}", limit)),
            },
            None => pumping.await,
        };
        drop(tracker);

        if let Err(reason) = pumped {
            let transferred = counter.load(Ordering::SeqCst);
            warn!(
                "Upload to {} failed after {} bytes: {}",
                target.target_name(),
                transferred,
                reason
            );
            target.abort().await;
            return Err(UploadError::transfer_failure(destination, transferred, reason));
        }

        let name = target.target_name();
        let bytes_transferred = target.finalize().await.map_err(|e| {
            warn!("Failed to close {}: {}", name, e);
            UploadError::transfer_failure(
                destination,
                counter.load(Ordering::SeqCst),
                format!("close failed: {}", e),
            )
        })?;

        let elapsed = started.elapsed();
        info!(
            "Uploaded {} bytes to {} in {:.2}s",
            bytes_transferred,
            name,
            elapsed.as_secs_f64()
        );

        Ok(Completion {
            destination: destination.to_string(),
            bytes_transferred,
            elapsed,
        })
    }

    /// Like [`put`](Self::put), but appends to an existing destination.
    pub async fn append(
        &self,
        source: UploadSource,
        destination: &str,
        options: UploadOptions,
    ) -> Result<Completion> {
        self.put(source, destination, options.mode(WriteMode::Append))
            .await
    }

    /// Upload the local file at `path`
    pub async fn put_file(
        &self,
        path: &Path,
        destination: &str,
        options: UploadOptions,
    ) -> Result<Completion> {
        self.put(UploadSource::path(path), destination, options).await
    }

    /// Attributes of a remote path
    pub async fn stat(&self, path: &str) -> std::result::Result<RemoteFileStat, RemoteError> {
        self.remote.stat(path).await
    }
}

/// Move every chunk of `stream` into `target`, counting acknowledged bytes.
async fn pump(
    mut stream: ByteStream,
    target: &mut dyn RemoteFile,
    counter: &AtomicU64,
    total_bytes: Option<u64>,
    on_progress: Option<&ProgressCallback>,
) -> std::result::Result<(), String> {
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| format!("source read failed: {}", e))?;
        if chunk.is_empty() {
            continue;
        }

        let len = chunk.len() as u64;
        target
            .write(chunk)
            .await
            .map_err(|e| format!("remote write failed: {}", e))?;

        let bytes_transferred = counter.fetch_add(len, Ordering::SeqCst) + len;
        if let Some(callback) = on_progress {
            callback(UploadProgress {
                bytes_transferred,
                total_bytes,
            });
        }
    }

    Ok(())
}
