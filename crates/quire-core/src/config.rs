//! Session configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! `#[derive(Serialize, Deserialize)]` generates the TOML mapping and
//! `#[serde(default)]` fills missing fields from `Default`, so a config
//! file only needs the keys it wants to change.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session behavior settings
    pub session: SessionConfig,

    /// File handling settings
    pub files: FileConfig,

    /// Editor engine settings
    pub editor: EditorConfig,
}

impl Config {
    /// Loads config from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::load_from_default_path() {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Using default config: {}", err);
                Self::default()
            }
        }
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("quire").join("config.toml"))
    }
}

/// Session behavior configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// File names that open the project settings instead of a tab.
    ///
    /// Matched exactly against the file name component, in any directory.
    pub reserved_file_names: Vec<String>,

    /// Message shown after saving the current document
    pub saved_message: String,

    /// Message shown after saving every document
    pub saved_all_message: String,
}

impl SessionConfig {
    /// Returns true if `path` names a reserved configuration file.
    pub fn is_reserved(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.reserved_file_names.iter().any(|r| r == name))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reserved_file_names: vec!["config.json".to_string()],
            saved_message: "Saved".to_string(),
            saved_all_message: "Saved all files".to_string(),
        }
    }
}

/// File handling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Max file size to open (MB)
    pub max_file_size_mb: u64,

    /// Write to a temp file and rename over the target
    pub atomic_save: bool,
}

impl FileConfig {
    /// Returns the open limit in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            atomic_save: true,
        }
    }
}

/// Editor engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo history limit
    pub undo_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self { undo_limit: 1000 }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
