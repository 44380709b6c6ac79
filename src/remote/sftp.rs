use std::fmt;
use std::io::Write;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use ssh2::{ErrorCode, OpenFlags, OpenType, Session, Sftp};
use tokio::time::sleep;

use crate::constants::{
    DEFAULT_CONNECTION_TIMEOUT_SECS, ERROR_AUTHENTICATION_FAILED, ERROR_FAILED_TO_CREATE_SESSION,
    ERROR_FAILED_TO_CREATE_SFTP, ERROR_LOCK_POISONED, MAX_CONNECT_RETRIES, RETRY_BASE_DELAY_MS,
    RETRY_MAX_DELAY_SECS, SFTP_DEFAULT_PORT,
};
use crate::error::{RemoteError, RemoteErrorKind};
use crate::remote::{FileKind, RemoteConnection, RemoteFile, RemoteFileStat, WriteMode, WriteOptions};

// SFTP status codes (draft-ietf-secsh-filexfer-02)
const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;
const FX_FAILURE: i32 = 4;
const FX_NO_CONNECTION: i32 = 6;
const FX_CONNECTION_LOST: i32 = 7;
const FX_NO_SUCH_PATH: i32 = 10;

/// Configuration for SFTP connections
#[derive(Clone)]
pub struct SftpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub passphrase: Option<String>,
    pub use_agent: bool,
    pub connection_timeout_sec: u64,
    pub max_retries: usize,
}

impl Default for SftpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: SFTP_DEFAULT_PORT,
            username: String::new(),
            password: None,
            private_key_path: None,
            passphrase: None,
            use_agent: false,
            connection_timeout_sec: DEFAULT_CONNECTION_TIMEOUT_SECS,
            max_retries: MAX_CONNECT_RETRIES,
        }
    }
}

impl fmt::Debug for SftpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("private_key_path", &self.private_key_path)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<REDACTED>"))
            .field("use_agent", &self.use_agent)
            .field("connection_timeout_sec", &self.connection_timeout_sec)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Retry configuration for establishing connections
struct RetryConfig {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryConfig {
    fn from_config(config: &SftpConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_secs(RETRY_MAX_DELAY_SECS),
        }
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1) as u32);
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }
}

/// An authenticated SSH session with its SFTP subsystem.
///
/// All libssh2 calls are blocking, so every operation runs on the tokio
/// blocking pool. The connection can be shared between concurrent uploads;
/// each open file carries its own handle lock.
pub struct SftpConnection {
    session: Arc<Mutex<Session>>,
    sftp: Arc<Mutex<Sftp>>,
    label: String,
}

impl SftpConnection {
    /// Connect and authenticate, retrying with exponential backoff.
    pub async fn connect(config: SftpConfig) -> Result<Self> {
        let retry = RetryConfig::from_config(&config);
        let label = format!("sftp://{}@{}:{}", config.username, config.host, config.port);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let attempt_config = config.clone();
            let result = tokio::task::spawn_blocking(move || establish(&attempt_config))
                .await
                .context("SSH connect task failed")?;

            match result {
                Ok((session, sftp)) => {
                    info!("Connected to {}", label);
                    return Ok(Self {
                        session: Arc::new(Mutex::new(session)),
                        sftp: Arc::new(Mutex::new(sftp)),
                        label,
                    });
                }
                Err(e) => {
                    if attempt >= retry.max_attempts {
                        return Err(e.context(format!(
                            "Failed to connect to {} after {} attempts",
                            label, retry.max_attempts
                        )));
                    }

                    let delay = retry.delay_for(attempt);
                    warn!("SSH connection attempt {} failed, retrying in {:?}: {}", attempt, delay, e);
                    sleep(delay).await;
                }
            }
        }
    }

    /// Disconnect the SSH session
    pub async fn close(self) -> Result<()> {
        let session = Arc::clone(&self.session);
        drop(self.sftp);

        tokio::task::spawn_blocking(move || {
            let session = session
                .lock()
                .map_err(|_| anyhow!(ERROR_LOCK_POISONED))?;
            session
                .disconnect(None, "closing connection", None)
                .context("Failed to disconnect SSH session")
        })
        .await
        .context("SSH disconnect task failed")??;

        debug!("Disconnected from {}", self.label);
        Ok(())
    }
}

/// Open the TCP connection, perform the handshake and authenticate.
fn establish(config: &SftpConfig) -> Result<(Session, Sftp)> {
    let tcp = TcpStream::connect((config.host.as_str(), config.port))
        .context(format!("Failed to connect to {}:{}", config.host, config.port))?;

    let timeout = Duration::from_secs(config.connection_timeout_sec);
    tcp.set_read_timeout(Some(timeout))
        .context("Failed to set read timeout")?;
    tcp.set_write_timeout(Some(timeout))
        .context("Failed to set write timeout")?;

    let mut session = Session::new().context(ERROR_FAILED_TO_CREATE_SESSION)?;
    session.set_tcp_stream(tcp);
    session.set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);
    session
        .handshake()
        .context("Failed to perform SSH handshake")?;

    authenticate(&session, config)?;

    if !session.authenticated() {
        return Err(anyhow!(ERROR_AUTHENTICATION_FAILED));
    }

    let sftp = session.sftp().context(ERROR_FAILED_TO_CREATE_SFTP)?;
    Ok((session, sftp))
}

fn authenticate(session: &Session, config: &SftpConfig) -> Result<()> {
    if let Some(key_path) = &config.private_key_path {
        debug!("Authenticating {} with private key {}", config.username, key_path.display());
        return session
            .userauth_pubkey_file(
                &config.username,
                None, // public key is derived from the private key
                key_path,
                config.passphrase.as_deref(),
            )
            .context(format!(
                "Failed to authenticate with private key: {}",
                key_path.display()
            ));
    }

    if let Some(password) = &config.password {
        debug!("Authenticating {} with password", config.username);
        return session
            .userauth_password(&config.username, password)
            .context("Failed to authenticate with password");
    }

    if config.use_agent {
        debug!("Authenticating {} with ssh-agent", config.username);
        return session
            .userauth_agent(&config.username)
            .context("Failed to authenticate with ssh-agent");
    }

    Err(anyhow!(
        "No authentication method configured for {}@{}",
        config.username,
        config.host
    ))
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RemoteError> {
    mutex
        .lock()
        .map_err(|_| RemoteError::new(RemoteErrorKind::Other, ERROR_LOCK_POISONED))
}

/// Map an ssh2 error onto the remote error taxonomy.
fn remote_error(err: ssh2::Error) -> RemoteError {
    let kind = match err.code() {
        ErrorCode::SFTP(FX_NO_SUCH_FILE) | ErrorCode::SFTP(FX_NO_SUCH_PATH) => RemoteErrorKind::NoSuchFile,
        ErrorCode::SFTP(FX_PERMISSION_DENIED) => RemoteErrorKind::PermissionDenied,
        ErrorCode::SFTP(FX_FAILURE) => RemoteErrorKind::Failure,
        ErrorCode::SFTP(FX_NO_CONNECTION) | ErrorCode::SFTP(FX_CONNECTION_LOST) => {
            RemoteErrorKind::ConnectionLost
        }
        ErrorCode::SFTP(_) => RemoteErrorKind::Other,
        ErrorCode::Session(_) => RemoteErrorKind::ConnectionLost,
    };
    RemoteError::new(kind, err.message().to_string())
}

fn join_error(err: tokio::task::JoinError) -> RemoteError {
    RemoteError::new(RemoteErrorKind::Other, format!("SFTP task failed: {}", err))
}

fn open_flags(mode: WriteMode) -> OpenFlags {
    match mode {
        WriteMode::Overwrite => OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
        WriteMode::Append => OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::APPEND,
    }
}

fn file_stat(stat: ssh2::FileStat) -> RemoteFileStat {
    let kind = if stat.is_dir() {
        FileKind::Directory
    } else if stat.is_file() {
        FileKind::File
    } else {
        FileKind::Other
    };

    RemoteFileStat {
        size: stat.size.unwrap_or(0),
        permissions: stat.perm,
        modified: stat
            .mtime
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0)),
        kind,
    }
}

#[async_trait]
impl RemoteConnection for SftpConnection {
    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn open_write(
        &self,
        path: &str,
        options: &WriteOptions,
    ) -> Result<Box<dyn RemoteFile>, RemoteError> {
        let sftp = Arc::clone(&self.sftp);
        let remote_path = path.to_string();
        let flags = open_flags(options.mode);
        let permissions = options.permissions;

        let file = tokio::task::spawn_blocking(move || {
            let sftp = lock(&sftp)?;
            sftp.open_mode(Path::new(&remote_path), flags, permissions, OpenType::File)
                .map_err(remote_error)
        })
        .await
        .map_err(join_error)??;

        debug!("Opened {} on {} for writing ({:?})", path, self.label, options.mode);

        Ok(Box::new(SftpFile {
            file: Some(Arc::new(Mutex::new(file))),
            target: format!("{}/{}", self.label, path.trim_start_matches('/')),
            written: 0,
        }))
    }

    async fn stat(&self, path: &str) -> Result<RemoteFileStat, RemoteError> {
        let sftp = Arc::clone(&self.sftp);
        let remote_path = path.to_string();

        tokio::task::spawn_blocking(move || {
            let sftp = lock(&sftp)?;
            sftp.stat(Path::new(&remote_path))
                .map(file_stat)
                .map_err(remote_error)
        })
        .await
        .map_err(join_error)?
    }
}

/// A remote file opened through [`SftpConnection`].
struct SftpFile {
    file: Option<Arc<Mutex<ssh2::File>>>,
    target: String,
    written: u64,
}

impl SftpFile {
    fn handle(&self) -> Result<Arc<Mutex<ssh2::File>>, RemoteError> {
        self.file
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| RemoteError::failure(format!("{} is already closed", self.target)))
    }
}

#[async_trait]
impl RemoteFile for SftpFile {
    fn target_name(&self) -> String {
        self.target.clone()
    }

    async fn write(&mut self, chunk: Bytes) -> Result<(), RemoteError> {
        let file = self.handle()?;
        let len = chunk.len() as u64;

        tokio::task::spawn_blocking(move || {
            let mut file = lock(&file)?;
            file.write_all(&chunk).map_err(RemoteError::from)
        })
        .await
        .map_err(join_error)??;

        self.written += len;
        Ok(())
    }

    async fn finalize(mut self: Box<Self>) -> Result<u64, RemoteError> {
        let file = self.handle()?;
        self.file = None;

        tokio::task::spawn_blocking(move || {
            let mut file = lock(&file)?;
            file.close().map_err(remote_error)
        })
        .await
        .map_err(join_error)??;

        debug!("Closed {} after {} bytes", self.target, self.written);
        Ok(self.written)
    }

    async fn abort(mut self: Box<Self>) {
        if let Some(file) = self.file.take() {
            // Dropping the handle sends the close request, which blocks.
            let _ = tokio::task::spawn_blocking(move || drop(file)).await;
        }
        debug!("Released {} after {} bytes without acknowledgment", self.target, self.written);
    }
}
