//! TOML-based configuration for the engine.
//!
//! Example configuration:
//! ```toml
//! [engine]
//! cache_enabled = true
//! max_eval_depth = 64
//! segment_prefetch_limit = 1000
//! drill_through_max_rows = 1000
//!
//! [statistics]
//! enabled = true
//!
//! [dialect]
//! name = "postgres"
//!
//! # or describe a database outside the built-in catalog
//! [dialect.descriptor]
//! name = "legacy"
//! quoting = "bracket"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::sql::{Dialect, DialectDescriptor, SqlDialect};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Unknown SQL dialect: {0}")]
    UnknownDialect(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Evaluation settings.
    pub engine: EngineSettings,

    /// Statistics settings.
    pub statistics: StatisticsSettings,

    /// SQL dialect selection.
    pub dialect: DialectSettings,
}

/// Evaluation settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Memoise cacheable calculations within one query.
    pub cache_enabled: bool,

    /// Maximum nesting of calculation evaluations.
    pub max_eval_depth: usize,

    /// Largest sibling count loaded with one grouped statement.
    pub segment_prefetch_limit: u64,

    /// Default row cap for drill-through.
    pub drill_through_max_rows: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            max_eval_depth: 64,
            segment_prefetch_limit: 1000,
            drill_through_max_rows: 1000,
        }
    }
}

/// Statistics settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StatisticsSettings {
    /// Estimate cardinalities at all. Disabled means every estimate is unknown.
    pub enabled: bool,
}

impl Default for StatisticsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// SQL dialect selection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DialectSettings {
    /// Built-in dialect name (see `Dialect::from_name`).
    pub name: String,

    /// Explicit capability flags; takes precedence over `name`.
    pub descriptor: Option<DialectDescriptor>,
}

impl Default for DialectSettings {
    fn default() -> Self {
        Self {
            name: "ansi".to_string(),
            descriptor: None,
        }
    }
}

impl DialectSettings {
    /// Resolve the configured dialect.
    pub fn resolve(&self) -> Result<Arc<dyn SqlDialect>, SettingsError> {
        if let Some(descriptor) = &self.descriptor {
            return Ok(Arc::new(descriptor.clone()));
        }
        Dialect::from_name(&self.name)
            .map(|d| Arc::new(d) as Arc<dyn SqlDialect>)
            .ok_or_else(|| SettingsError::UnknownDialect(self.name.clone()))
    }
}

impl Settings {
    /// Parse settings from TOML text and validate them.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `ROLAP_CONFIG`
    /// 2. `./rolap.toml`
    /// 3. `~/.config/rolap/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("ROLAP_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("rolap.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("rolap").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.engine.max_eval_depth == 0 {
            return Err(SettingsError::InvalidConfig(
                "engine.max_eval_depth must be at least 1".to_string(),
            ));
        }
        self.dialect.resolve()?;
        Ok(())
    }
}
