//! Configuration module.
//!
//! Engine, statistics and dialect settings loaded from TOML.

mod settings;

pub use settings::{
    DialectSettings, EngineSettings, Settings, SettingsError, StatisticsSettings,
};
