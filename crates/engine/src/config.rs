//! Registry configuration via `modelreg.toml`
//!
//! All settings have defaults; a config file only needs the sections it
//! changes. A commented default file can be written on first use.

use modelreg_concurrency::{CacheConfig, WorkerConfig};
use modelreg_core::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "modelreg.toml";

/// Registry configuration loaded from `modelreg.toml`.
///
/// # Example
///
/// ```toml
/// [cache]
/// capacity = 4096
/// wait_interval_ms = 1000
/// max_wait_ms = 60000
///
/// [workers]
/// threads = 4
/// queue_depth = 4096
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Model cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Build worker settings.
    #[serde(default)]
    pub workers: WorkerConfig,
}

impl RegistryConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# modelreg configuration

[cache]
# Resolved models kept before the least recently used is evicted
capacity = 4096
# Length of one wait slice on a pending build
wait_interval_ms = 1000
# Overall wait deadline; callers past it fail with a resolution timeout
max_wait_ms = 60000

[workers]
# Background build threads
threads = 4
# Queued builds before new builds are rejected
queue_depth = 4096
"#
    }

    /// Check every section.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.cache.check().map_err(ModelError::config)?;
        self.workers.check().map_err(ModelError::config)?;
        Ok(())
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RegistryConfig = toml::from_str(content)
            .map_err(|e| ModelError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ModelError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ModelError::Config(msg) => {
                ModelError::Config(format!("{} (in '{}')", msg, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                ModelError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ModelError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            ModelError::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
