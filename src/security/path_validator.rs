//! Validation of remote destination paths.
//!
//! Destinations are passed to the server unchanged (relative paths resolve
//! against the server's working directory), so validation only rejects what
//! can never name a file.

use std::path::Path;

use anyhow::{bail, Result};

/// Check that `path` can name a remote file.
///
/// # Errors
///
/// Fails if the path is empty, contains a NUL byte, or ends with `/` (which
/// names a directory).
pub fn validate_destination(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        bail!("Destination path is empty");
    }

    if path.contains('\0') {
        bail!("Destination path contains null bytes");
    }

    if path.ends_with('/') {
        bail!("Destination path names a directory: {}", path);
    }

    Ok(())
}

/// Join a remote directory and a file name with exactly one `/`.
pub fn join_remote(dir: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        return name.to_string();
    }
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

/// Remote destination for a local file uploaded into `remote_dir`.
///
/// Returns `None` when the local path has no file name (for example `..`).
pub fn destination_in_dir(remote_dir: &str, local: &Path) -> Option<String> {
    let name = local.file_name()?.to_str()?;
    Some(join_remote(remote_dir, name))
}
