use std::sync::Arc;
use std::time::Duration;

use crate::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_FILE_MODE};
use crate::error::{Result, UploadError};
use crate::remote::{WriteMode, WriteOptions};
use crate::upload::{Encoding, UploadProgress};

/// Callback invoked after every acknowledged chunk
pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

#[derive(Clone)]
pub struct UploadOptions {
    /// Declared encoding name, checked before any I/O
    pub encoding: Option<String>,
    pub mode: WriteMode,
    pub permissions: i32,
    pub chunk_size: usize,
    pub timeout: Option<Duration>,
    pub on_progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOptions")
            .field("encoding", &self.encoding)
            .field("mode", &self.mode)
            .field("permissions", &format_args!("{:o}", self.permissions))
            .field("chunk_size", &self.chunk_size)
            .field("timeout", &self.timeout)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            encoding: None,
            mode: WriteMode::Overwrite,
            permissions: DEFAULT_FILE_MODE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: None,
            on_progress: None,
        }
    }
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoding(mut self, name: impl Into<String>) -> Self {
        self.encoding = Some(name.into());
        self
    }

    pub fn mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn permissions(mut self, permissions: i32) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// The declared encoding, utf8 when none was given
    pub fn parsed_encoding(&self) -> Result<Encoding> {
        match &self.encoding {
            Some(name) => name.parse(),
            None => Ok(Encoding::Utf8),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.parsed_encoding()?;

        if self.chunk_size == 0 {
            return Err(UploadError::invalid_options("chunk size must be greater than zero"));
        }
        if !(0..=0o7777).contains(&self.permissions) {
            return Err(UploadError::invalid_options(format!(
                "permissions {:o} are out of range",
                self.permissions
            )));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(UploadError::invalid_options("timeout must be greater than zero"));
        }

        Ok(())
    }

    pub(crate) fn write_options(&self) -> WriteOptions {
        WriteOptions {
            mode: self.mode,
            permissions: self.permissions,
        }
    }
}

/// Parse an octal permission string such as `644` or `0o600`.
pub fn parse_permissions(text: &str) -> Result<i32> {
    let digits = text.trim();
    let digits = digits.strip_prefix("0o").unwrap_or(digits);

    match i32::from_str_radix(digits, 8) {
        Ok(mode) if (0..=0o7777).contains(&mode) => Ok(mode),
        _ => Err(UploadError::invalid_options(format!(
            "invalid permissions '{}'",
            text
        ))),
    }
}
