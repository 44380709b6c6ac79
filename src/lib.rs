//! # sftp_put
//!
//! Upload data to an SFTP server from an in-memory buffer, a byte stream or a
//! local file, with failures reported as distinct error kinds.
//!
//! ## Overview
//!
//! The [`Uploader`](upload::Uploader) runs one linear pipeline per call:
//! resolve the source, open the remote destination, pump the bytes, then
//! close and wait for the server's acknowledgment. Each phase fails with its
//! own [`UploadError`](error::UploadError) variant, so callers can tell a
//! missing local file from a bad remote directory or a broken transfer.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use sftp_put::remote::sftp::{SftpConfig, SftpConnection};
//! use sftp_put::upload::{UploadOptions, UploadSource, Uploader};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let connection = SftpConnection::connect(SftpConfig {
//!     host: "files.example.com".to_string(),
//!     username: "uploader".to_string(),
//!     use_agent: true,
//!     ..Default::default()
//! })
//! .await?;
//!
//! let uploader = Uploader::new(Arc::new(connection));
//! let done = uploader
//!     .put(UploadSource::buffer("hello"), "upload/hello.txt", UploadOptions::default())
//!     .await?;
//! assert_eq!(done.bytes_transferred, 5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`upload`]: sources, options and the uploader
//! - [`remote`]: remote store traits, the SFTP connection and an in-memory store
//! - [`local`]: local filesystem access for path sources
//! - [`error`]: the upload error taxonomy
//! - [`config`]: YAML connection profiles
//! - [`security`]: destination validation and credential scrubbing
//! - [`cli`]: command-line interface definitions
//! - [`constants`]: application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Configuration management
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Upload error types
pub mod error;

/// Local filesystem access
pub mod local;

/// Remote store abstraction and implementations
pub mod remote;

/// Security utilities for path validation and credential protection
pub mod security;

/// Sources, options and the uploader
pub mod upload;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;

pub use error::{UploadError, Result};
pub use upload::{Completion, UploadOptions, UploadSource, Uploader};
