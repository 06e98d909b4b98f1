//! Configuration file handling for `config.ini`.
//!
//! Settings structs live in [`super::settings`], parsing in
//! [`super::parser`], and serialization in [`super::writer`].

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::settings::{ConfigError, StreamingConfig};

/// Name of the directory holding terrastream's configuration.
pub const CONFIG_DIR_NAME: &str = "terrastream";

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Values parsed but are inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigError),

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl StreamingConfig {
    /// Load configuration from a specific path.
    ///
    /// A missing file yields the defaults. The result is validated.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        let config = super::parser::parse_ini(&ini)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Serialized form, as [`save`](Self::save) would write it.
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }
}

/// Get the path to the config directory (e.g. `~/.config/terrastream`).
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Get the path to the default config file.
pub fn default_config_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}
