//! Configuration management for gitspace

pub mod schema;

pub use schema::{Config, GitConfig, WorkspaceConfig};

use crate::error::{GitspaceError, GitspaceResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use toml_edit::DocumentMut;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gitspace")
            .join("config.toml")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> GitspaceResult<Config> {
        if !self.config_path.exists() {
            debug!(path = %self.config_path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load and check configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> GitspaceResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| GitspaceError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| GitspaceError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.check().map_err(|reason| GitspaceError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })?;

        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> GitspaceResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            GitspaceError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Set a single dotted key, keeping the rest of the file (and its
    /// comments) untouched
    ///
    /// The edited document must still load as a valid `Config`, otherwise
    /// nothing is written.
    pub async fn set_value(&self, key: &str, value: toml_edit::Value) -> GitspaceResult<()> {
        let existing = if self.config_path.exists() {
            fs::read_to_string(&self.config_path).await.map_err(|e| {
                GitspaceError::io(format!("reading config from {}", self.config_path.display()), e)
            })?
        } else {
            toml::to_string_pretty(&Config::default())?
        };

        let mut doc: DocumentMut = existing.parse()?;
        let (table, field) = key.split_once('.').ok_or_else(|| GitspaceError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: format!("key must be section.field, got '{key}'"),
        })?;

        let section = doc
            .entry(table)
            .or_insert(toml_edit::table())
            .as_table_like_mut()
            .ok_or_else(|| GitspaceError::ConfigInvalid {
                path: self.config_path.clone(),
                reason: format!("'{table}' is not a section"),
            })?;
        section.insert(field, toml_edit::value(value));

        let rendered = doc.to_string();
        let config: Config = toml::from_str(&rendered).map_err(|e| GitspaceError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })?;
        config.check().map_err(|reason| GitspaceError::ConfigInvalid {
            path: self.config_path.clone(),
            reason,
        })?;

        self.ensure_config_dir().await?;
        fs::write(&self.config_path, rendered).await.map_err(|e| {
            GitspaceError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!(key, "Configuration value updated");
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> GitspaceResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| GitspaceError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
