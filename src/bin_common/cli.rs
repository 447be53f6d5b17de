//! CLI utilities for binaries
//!
//! Resolves configuration file paths from the environment.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Session client configuration (config/session.yaml)
    Session,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Session => "config/session.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        "TUTOR_CONFIG_PATH"
    }
}

/// Load configuration path from environment or use default
///
/// # Examples
/// ```
/// use local_tutor::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Session);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    resolve_config_path(&config_type, |key| std::env::var(key).ok())
}

/// Resolve the configuration path with an explicit environment lookup
pub fn resolve_config_path(
    config_type: &ConfigType,
    lookup: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    lookup(config_type.env_var_name())
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| config_type.default_path().to_string())
        .into()
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}
