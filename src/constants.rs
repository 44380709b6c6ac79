//! Global constants for sftp_put.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Transfer constants
/// Default read size for path and reader sources (64KB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Permissions applied to newly created remote files
pub const DEFAULT_FILE_MODE: i32 = 0o666;

// Connection constants
/// Default SFTP port
pub const SFTP_DEFAULT_PORT: u16 = 22;

/// Default connection timeout in seconds
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Maximum connection attempts before giving up
pub const MAX_CONNECT_RETRIES: usize = 3;

/// Base retry delay in milliseconds
pub const RETRY_BASE_DELAY_MS: u64 = 250;

/// Maximum retry delay in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 30;

/// Progress reporting interval in seconds
pub const PROGRESS_REPORT_INTERVAL_SECS: u64 = 2;

// Error messages
pub const ERROR_FAILED_TO_CREATE_SESSION: &str = "Failed to create SSH session";
pub const ERROR_FAILED_TO_CREATE_SFTP: &str = "Failed to create SFTP subsystem";
pub const ERROR_AUTHENTICATION_FAILED: &str = "Authentication failed";
pub const ERROR_LOCK_POISONED: &str = "SFTP handle lock poisoned";

// Default file names
pub const DEFAULT_CONFIG_NAME: &str = "sftp-put.yaml";
