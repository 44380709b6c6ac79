//! Test utilities for sftp_put
//!
//! Common fixtures shared by the unit test modules.

#![cfg(test)]

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};

use crate::remote::memory::MemoryStore;
use crate::upload::Uploader;

/// Home directory of the simulated remote user
pub const TEST_HOME: &str = "/home/tester";

/// Creates a temporary directory that is automatically cleaned up
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a temporary file with the given content
pub fn create_temp_file(content: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content)?;
    file.flush()?;
    Ok(file)
}

/// Creates a test YAML configuration file
pub fn create_test_config() -> Result<NamedTempFile> {
    let config_content = r#"
connection:
  host: "sftp.test.local"
  port: 2222
  username: "tester"
  use_agent: true
upload:
  chunk_size_kb: 8
  permissions: "640"
"#;
    create_temp_file(config_content.as_bytes())
}

/// A memory store with an `upload` directory under [`TEST_HOME`], and an
/// uploader bound to it.
pub fn memory_uploader() -> (MemoryStore, Uploader) {
    let store = MemoryStore::new(TEST_HOME);
    store.create_dir_all("upload");
    let uploader = Uploader::new(Arc::new(store.clone()));
    (store, uploader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    #[test]
    fn test_create_temp_file() {
        let file = create_temp_file(b"fixture").unwrap();
        assert_eq!(std::fs::read(file.path()).unwrap(), b"fixture");
        assert!(create_temp_dir().unwrap().path().is_dir());
    }

    #[test]
    fn test_fixture_config_parses() {
        let file = create_test_config().unwrap();
        let config = ClientConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.connection.port, 2222);
        assert_eq!(config.upload_options().unwrap().chunk_size, 8 * 1024);
    }

    #[tokio::test]
    async fn test_memory_uploader() {
        let (store, uploader) = memory_uploader();
        uploader
            .put(
                crate::upload::UploadSource::buffer("x"),
                "upload/x.txt",
                Default::default(),
            )
            .await
            .unwrap();
        assert_eq!(store.contents("/home/tester/upload/x.txt").unwrap(), b"x");
    }
}
