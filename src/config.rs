//! Application configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty or partial
//! file is valid:
//!
//! ```toml
//! providers = ["lrclib", "hymnary"]
//!
//! [search]
//! default_limit = 10
//! cache_ttl_seconds = 300
//! ```

use std::path::{Path, PathBuf};

use canticle_search::SearchConfig;
use canticle_search::providers::builtin_ids;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Top-level configuration for the `canticle` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Provider ids to register, in priority order. Earlier providers win
    /// score ties.
    pub providers: Vec<String>,
    /// Engine tuning.
    pub search: SearchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            providers: builtin_ids(),
            search: SearchConfig::default(),
        }
    }
}

impl AppConfig {
    /// Check the search settings and that every provider id is a known,
    /// non-repeated built-in.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.search
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        if self.providers.is_empty() {
            return Err(AppError::Config("at least one provider must be enabled".into()));
        }
        let known = builtin_ids();
        for (i, id) in self.providers.iter().enumerate() {
            if !known.contains(id) {
                return Err(AppError::Config(format!(
                    "unknown provider {id:?}; expected one of {}",
                    known.join(", ")
                )));
            }
            if self.providers[..i].contains(id) {
                return Err(AppError::Config(format!("provider {id:?} listed twice")));
            }
        }
        Ok(())
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path, e.g. `~/.config/canticle/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::canticle_dirs::config_file()
    }

    /// Load `explicit` if given, else the default path if it exists, else
    /// the built-in defaults. The result is validated.
    ///
    /// # Errors
    ///
    /// An explicit path that cannot be read is an error; a missing default
    /// file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::default_config_path();
                if path.exists() {
                    tracing::debug!(path = %path.display(), "loading config");
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }
}
