use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::info;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::constants::PROGRESS_REPORT_INTERVAL_SECS;

/// Snapshot handed to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_transferred: u64,
    /// Known for buffer and path sources, unknown for streams
    pub total_bytes: Option<u64>,
}

impl UploadProgress {
    /// Completed fraction in `0.0..=1.0`, when the total is known
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(1.0),
            Some(total) => Some((self.bytes_transferred as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// Periodically logs upload progress for one destination.
pub struct ProgressTracker {
    target: String,
    total_size: Option<u64>,
    bytes_uploaded: Arc<AtomicU64>,
    start_time: Instant,
    interval: Duration,
}

impl ProgressTracker {
    pub fn new(target: String, total_size: Option<u64>, bytes_uploaded: Arc<AtomicU64>) -> Self {
        Self {
            target,
            total_size,
            bytes_uploaded,
            start_time: Instant::now(),
            interval: Duration::from_secs(PROGRESS_REPORT_INTERVAL_SECS),
        }
    }

    /// Start tracking progress in a background task. The task stops when the
    /// returned handle is dropped.
    pub fn start_tracking(self) -> TrackingHandle {
        TrackingHandle(tokio::spawn(async move {
            if self.total_size == Some(0) {
                return;
            }

            let mut last_percentage = 0u64;
            loop {
                sleep(self.interval).await;

                let bytes_uploaded = self.bytes_uploaded.load(Ordering::SeqCst);
                let elapsed = self.start_time.elapsed().as_secs_f64();
                let speed = if elapsed > 0.0 {
                    bytes_uploaded as f64 / elapsed / 1024.0 / 1024.0
                } else {
                    0.0
                };

                match self.total_size {
                    Some(total) => {
                        let percentage = bytes_uploaded.saturating_mul(100) / total;
                        // Report progress if it's changed by at least 5%
                        if percentage >= last_percentage + 5 {
                            info!(
                                "Upload progress for {}: {}% ({}/{} bytes, {:.2} MB/s)",
                                self.target, percentage, bytes_uploaded, total, speed
                            );
                            last_percentage = percentage;
                        }
                        if bytes_uploaded >= total {
                            break;
                        }
                    }
                    None => {
                        info!(
                            "Upload progress for {}: {} bytes ({:.2} MB/s)",
                            self.target, bytes_uploaded, speed
                        );
                    }
                }
            }
        }))
    }
}

/// Owns the tracking task and aborts it on drop, so a cancelled upload
/// never leaves a tracker behind.
#[derive(Debug)]
pub struct TrackingHandle(JoinHandle<()>);

impl TrackingHandle {
    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        let progress = UploadProgress {
            bytes_transferred: 50,
            total_bytes: Some(200),
        };
        assert_eq!(progress.fraction(), Some(0.25));

        let unknown = UploadProgress {
            bytes_transferred: 50,
            total_bytes: None,
        };
        assert_eq!(unknown.fraction(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracker_stops_when_complete() {
        let counter = Arc::new(AtomicU64::new(0));
        let handle = ProgressTracker::new("memory:///x".to_string(), Some(10), Arc::clone(&counter))
            .start_tracking();

        counter.store(10, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(PROGRESS_REPORT_INTERVAL_SECS + 1)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_stream_tracker() {
        let counter = Arc::new(AtomicU64::new(0));
        let handle = ProgressTracker::new("memory:///s".to_string(), None, Arc::clone(&counter))
            .start_tracking();
        assert_eq!(Arc::strong_count(&counter), 2);

        drop(handle);
        for _ in 0..100 {
            if Arc::strong_count(&counter) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(Arc::strong_count(&counter), 1);
    }
}
