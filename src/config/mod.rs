// Re-export all items from the submodules
mod client_config;
mod env_vars;

// Re-export client config
pub use client_config::{load_or_default, ClientConfig, ConnectionSettings, UploadSettings};

// Re-export environment variable functions
pub use env_vars::{expand_all, expand_env_vars, expand_home};
