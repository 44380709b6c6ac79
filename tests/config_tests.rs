//! Integration tests for configuration loading.

use std::fs;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use sftp_put::config::{load_or_default, ClientConfig};

/// Test loading a full profile with environment expansion
#[test]
fn test_full_profile() -> Result<()> {
    std::env::set_var("SFTP_PUT_IT_HOST", "files.example.com");
    std::env::set_var("SFTP_PUT_IT_PASS", "s3cret");

    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("profile.yaml");
    fs::write(
        &path,
        r#"
connection:
  host: "${SFTP_PUT_IT_HOST}"
  port: 2022
  username: deploy
  password: "$SFTP_PUT_IT_PASS"
  private_key: ""
  max_retries: 5
upload:
  chunk_size_kb: 32
  permissions: "0o640"
  encoding: latin1
  timeout_sec: 120
"#,
    )?;

    let config = load_or_default(Some(&path))?;
    let sftp = config.sftp_config()?;
    assert_eq!(sftp.host, "files.example.com");
    assert_eq!(sftp.port, 2022);
    assert_eq!(sftp.password.as_deref(), Some("s3cret"));
    assert!(sftp.private_key_path.is_none());
    assert_eq!(sftp.max_retries, 5);
    assert!(!format!("{:?}", sftp).contains("s3cret"));
    assert!(!format!("{:?}", config).contains("s3cret"));

    let options = config.upload_options()?;
    assert_eq!(options.chunk_size, 32 * 1024);
    assert_eq!(options.permissions, 0o640);
    assert_eq!(options.encoding.as_deref(), Some("latin1"));
    assert_eq!(options.timeout, Some(Duration::from_secs(120)));

    std::env::remove_var("SFTP_PUT_IT_HOST");
    std::env::remove_var("SFTP_PUT_IT_PASS");
    Ok(())
}

/// Test that init-config output loads back unchanged
#[test]
fn test_default_config_file_round_trip() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("sftp-put.yaml");

    ClientConfig::create_default_config_file(&path)?;
    let written = fs::read_to_string(&path)?;
    assert!(written.contains("connection:"));
    assert!(written.contains("upload:"));
    assert!(!written.contains("password"));

    let loaded = ClientConfig::from_yaml_file(&path)?;
    assert_eq!(loaded, ClientConfig::default());
    Ok(())
}

/// Test that a broken file is an error rather than silently defaulted
#[test]
fn test_unreadable_profile() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("broken.yaml");
    fs::write(&path, "connection:\n  port: not-a-number\n")?;

    let err = load_or_default(Some(&path)).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse YAML config"));
    Ok(())
}
