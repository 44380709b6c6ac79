use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::env_vars::{expand_all, expand_env_vars};
use crate::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_FILE_MODE, MAX_CONNECT_RETRIES,
    SFTP_DEFAULT_PORT,
};
use crate::remote::sftp::SftpConfig;
use crate::upload::{parse_permissions, UploadOptions};

/// Connection profile for the SFTP server.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    pub use_agent: bool,
    pub connection_timeout_sec: u64,
    pub max_retries: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: SFTP_DEFAULT_PORT,
            username: "${USER}".to_string(),
            password: None,
            private_key: None,
            passphrase: None,
            use_agent: false,
            connection_timeout_sec: DEFAULT_CONNECTION_TIMEOUT_SECS,
            max_retries: MAX_CONNECT_RETRIES,
        }
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("private_key", &self.private_key)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<REDACTED>"))
            .field("use_agent", &self.use_agent)
            .field("connection_timeout_sec", &self.connection_timeout_sec)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Defaults applied to every upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadSettings {
    pub chunk_size_kb: usize,
    /// Octal mode for newly created files, e.g. "644"
    pub permissions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Seconds before a stalled transfer is aborted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u64>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            chunk_size_kb: DEFAULT_CHUNK_SIZE / 1024,
            permissions: format!("{:o}", DEFAULT_FILE_MODE),
            encoding: None,
            timeout_sec: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub connection: ConnectionSettings,
    pub upload: UploadSettings,
}

impl ClientConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: ClientConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml).context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Create a default configuration YAML file
    pub fn create_default_config_file(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Refusing to overwrite existing config file: {}", path.display());
        }
        ClientConfig::default().save_to_yaml_file(path)
    }

    /// Expand `${VAR}`, `$VAR` and `~/` in string values
    pub fn process_environment_variables(&mut self) {
        let conn = &mut self.connection;
        conn.host = expand_env_vars(&conn.host);
        conn.username = expand_env_vars(&conn.username);
        conn.password = conn.password.as_deref().map(expand_env_vars);
        conn.passphrase = conn.passphrase.as_deref().map(expand_env_vars);
        conn.private_key = conn.private_key.as_deref().map(expand_all);
    }

    /// Build the connection configuration
    pub fn sftp_config(&self) -> Result<SftpConfig> {
        let conn = &self.connection;
        if conn.host.is_empty() {
            bail!("No SFTP host configured");
        }
        if conn.username.is_empty() {
            bail!("No SFTP username configured");
        }

        Ok(SftpConfig {
            host: conn.host.clone(),
            port: conn.port,
            username: conn.username.clone(),
            password: conn.password.clone().filter(|p| !p.is_empty()),
            private_key_path: conn
                .private_key
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            passphrase: conn.passphrase.clone().filter(|p| !p.is_empty()),
            use_agent: conn.use_agent,
            connection_timeout_sec: conn.connection_timeout_sec,
            max_retries: conn.max_retries,
        })
    }

    /// Build the default upload options
    pub fn upload_options(&self) -> Result<UploadOptions> {
        let upload = &self.upload;
        let permissions = parse_permissions(&upload.permissions)
            .context("Invalid upload.permissions in config")?;

        let mut options = UploadOptions::new()
            .permissions(permissions)
            .chunk_size(upload.chunk_size_kb.saturating_mul(1024));
        if let Some(encoding) = &upload.encoding {
            options = options.encoding(encoding.clone());
        }
        if let Some(secs) = upload.timeout_sec {
            options = options.timeout(Duration::from_secs(secs));
        }

        options
            .validate()
            .context("Invalid upload settings in config")?;
        Ok(options)
    }
}

/// Load the configuration at `config_path`, or the built-in defaults when no
/// path is given or the file does not exist. Environment variables are
/// expanded in both cases.
pub fn load_or_default(config_path: Option<&Path>) -> Result<ClientConfig> {
    let mut config = match config_path {
        Some(path) if path.exists() => ClientConfig::from_yaml_file(path)?,
        Some(path) => {
            info!("Config file {} not found, using defaults", path.display());
            ClientConfig::default()
        }
        None => {
            let local = Path::new(crate::constants::DEFAULT_CONFIG_NAME);
            if local.exists() {
                ClientConfig::from_yaml_file(local)?
            } else {
                debug!("No config path provided, using default configuration");
                ClientConfig::default()
            }
        }
    };

    config.process_environment_variables();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_save_and_load_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("client.yaml");

        let mut config = ClientConfig::default();
        config.connection.host = "files.example.com".to_string();
        config.upload.permissions = "600".to_string();
        config.save_to_yaml_file(&path).unwrap();

        let loaded = ClientConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "connection:\n  host: sftp.internal\n  username: deploy").unwrap();

        let config = ClientConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.connection.host, "sftp.internal");
        assert_eq!(config.connection.port, 22);
        assert_eq!(config.upload.chunk_size_kb, 64);
        assert_eq!(config.upload.permissions, "666");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "connection: [not, a, map").unwrap();
        assert!(ClientConfig::from_yaml_file(file.path()).is_err());
    }

    #[test]
    fn test_environment_expansion() {
        std::env::set_var("SFTP_PUT_CFG_PASSWORD", "from-env");

        let mut config = ClientConfig::default();
        config.connection.username = "deploy".to_string();
        config.connection.password = Some("${SFTP_PUT_CFG_PASSWORD}".to_string());
        config.process_environment_variables();

        assert_eq!(config.connection.password.as_deref(), Some("from-env"));
        assert_eq!(config.connection.username, "deploy");

        std::env::remove_var("SFTP_PUT_CFG_PASSWORD");
    }

    #[test]
    fn test_sftp_config_and_upload_options() {
        let mut config = ClientConfig::default();
        config.connection.host = "files.example.com".to_string();
        config.connection.username = "deploy".to_string();
        config.connection.private_key = Some(String::new());
        config.upload.permissions = "640".to_string();
        config.upload.timeout_sec = Some(30);

        let sftp = config.sftp_config().unwrap();
        assert_eq!(sftp.host, "files.example.com");
        assert!(sftp.private_key_path.is_none());

        let options = config.upload_options().unwrap();
        assert_eq!(options.permissions, 0o640);
        assert_eq!(options.chunk_size, 64 * 1024);
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_bad_upload_settings_are_rejected() {
        let mut config = ClientConfig::default();
        config.upload.encoding = Some("klingon".to_string());
        assert!(config.upload_options().is_err());

        let mut config = ClientConfig::default();
        config.upload.permissions = "rwx".to_string();
        assert!(config.upload_options().is_err());
    }

    #[test]
    fn test_agent_profile_has_no_key() {
        let file = crate::test_utils::create_test_config().unwrap();
        let config = ClientConfig::from_yaml_file(file.path()).unwrap();

        let sftp = config.sftp_config().unwrap();
        assert!(sftp.use_agent);
        assert!(sftp.private_key_path.is_none());
        assert!(sftp.password.is_none());
    }

    #[test]
    fn test_missing_host_is_rejected() {
        let mut config = ClientConfig::default();
        config.connection.host = String::new();
        assert!(config.sftp_config().is_err());
    }

    #[test]
    fn test_load_or_default() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.yaml");
        let config = load_or_default(Some(&missing)).unwrap();
        assert_eq!(config.connection.port, 22);
        assert!(!missing.exists());

        let existing = temp_dir.path().join("existing.yaml");
        ClientConfig::create_default_config_file(&existing).unwrap();
        assert!(load_or_default(Some(&existing)).is_ok());
        assert!(ClientConfig::create_default_config_file(&existing).is_err());
    }
}
