//! Security utilities.
//!
//! This module provides:
//! - Destination path validation
//! - Credential scrubbing to keep secrets out of logs and error output

pub mod credential_scrubber;
pub mod path_validator;

pub use credential_scrubber::{safe_error_message, scrub_credentials, scrub_path};
pub use path_validator::{destination_in_dir, join_remote, validate_destination};
