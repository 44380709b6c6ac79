//! Credential scrubbing for log lines and error messages.
//!
//! SSH passwords, key passphrases and credentials embedded in URLs must not
//! reach logs or terminal output. Messages built from connection errors pass
//! through [`safe_error_message`] before they are shown.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex patterns for detecting credentials
    static ref CREDENTIAL_PATTERNS: Vec<(Regex, &'static str)> = vec![
        // Passphrases for private keys
        (Regex::new(r#"(?i)(passphrase|key[_-]?passphrase)\s*[:=]\s*("[^"]*"|'[^']*'|[^\r\n]+)"#).unwrap(),
         "$1=<REDACTED_PASSPHRASE>"),

        // Generic passwords
        (Regex::new(r"(?i)(password|passwd|pwd)\s*[:=]\s*([^\s]+)").unwrap(),
         "$1=<REDACTED_PASSWORD>"),

        // SSH private key paths
        (Regex::new(r"(?i)(private[_-]?key|ssh[_-]?key|key[_-]?file|identity[_-]?file)\s*[:=]\s*([^\s]+\.pem|[^\s]+\.key|[^\s]+id_(rsa|dsa|ecdsa|ed25519)[^\s]*)").unwrap(),
         "$1=<REDACTED_KEY_PATH>"),

        // Credentials in sftp/ssh/scp URLs
        (Regex::new(r"(?i)(sftp|ssh|scp)://([^:/@\s]+):([^@\s]+)@").unwrap(),
         "$1://$2:<REDACTED_PASS>@"),

        // Basic auth in URLs
        (Regex::new(r"(https?://)([^:/@\s]+):([^@\s]+)@").unwrap(),
         "$1<REDACTED_USER>:<REDACTED_PASS>@"),
    ];

    /// Paths that usually hold key material
    static ref SENSITIVE_PATH_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\.ssh/").unwrap(),
        Regex::new(r"(?i)\.gnupg/").unwrap(),
        Regex::new(r"(?i)id_rsa").unwrap(),
        Regex::new(r"(?i)id_dsa").unwrap(),
        Regex::new(r"(?i)id_ecdsa").unwrap(),
        Regex::new(r"(?i)id_ed25519").unwrap(),
        Regex::new(r"(?i)\.pem$").unwrap(),
        Regex::new(r"(?i)\.key$").unwrap(),
        Regex::new(r"(?i)\.ppk$").unwrap(),
    ];
}

/// Scrub credentials from a string.
///
/// # Example
///
/// ```
/// use sftp_put::security::credential_scrubber::scrub_credentials;
///
/// let input = "Failed to connect with password=secret123";
/// let scrubbed = scrub_credentials(input);
/// assert_eq!(scrubbed, "Failed to connect with password=<REDACTED_PASSWORD>");
/// ```
pub fn scrub_credentials(input: &str) -> String {
    let mut result = input.to_string();

    for (pattern, replacement) in CREDENTIAL_PATTERNS.iter() {
        result = pattern.replace_all(&result, *replacement).to_string();
    }

    result
}

/// Check if a path looks like it holds key material.
pub fn is_sensitive_path(path: &str) -> bool {
    SENSITIVE_PATH_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(path))
}

/// Replace the file name of a sensitive path with a placeholder, keeping the
/// directory for debugging.
pub fn scrub_path(path: &str) -> String {
    if !is_sensitive_path(path) {
        return path.to_string();
    }

    if let Some(pos) = path.rfind(|c| c == '/' || c == '\\') {
        let dir = &path[..pos];
        format!("{}/[REDACTED_SENSITIVE_FILE]", dir)
    } else {
        "[REDACTED_SENSITIVE_FILE]".to_string()
    }
}

/// Format `context: error` with credentials scrubbed.
pub fn safe_error_message(context: &str, error: &impl std::fmt::Display) -> String {
    let raw_message = format!("{}: {}", context, error);
    scrub_credentials(&raw_message)
}
