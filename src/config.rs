//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/featmodel/featmodel.toml`
//! 3. Explicit config file passed to [`Settings::load`]
//! 4. Environment variables: `FEATMODEL__*` (e.g. `FEATMODEL__IDENTIFIERS__STRATEGY=uuid`)

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{CounterFactory, FeatureModel, IdentifierFactory, UuidFactory};
use crate::errors::{SettingsError, SettingsResult};

/// How new identifiers are issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierStrategy {
    #[default]
    Counter,
    Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierSettings {
    pub strategy: IdentifierStrategy,
    /// First value of a counter factory
    pub counter_start: u64,
}

impl Default for IdentifierSettings {
    fn default() -> Self {
        Self {
            strategy: IdentifierStrategy::Counter,
            counter_start: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `"featmodel=debug"`
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

/// Unified configuration for featmodel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub identifiers: IdentifierSettings,
    pub logging: LoggingSettings,
}

/// Get the XDG config directory for featmodel.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "featmodel").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("featmodel.toml"))
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; it must exist if given
    pub fn load(config_file: Option<&Path>) -> SettingsResult<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("identifiers.strategy", "counter")?
            .set_default("identifiers.counter_start", defaults.identifiers.counter_start)?
            .set_default("logging.filter", defaults.logging.filter.clone())?;

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!(path = %global_path.display(), "loading global config");
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(path) = config_file {
            debug!(path = %path.display(), "loading config file");
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix("FEATMODEL").separator("__"));

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> SettingsResult<()> {
        if self.identifiers.strategy == IdentifierStrategy::Counter && self.identifiers.counter_start == 0 {
            return Err(SettingsError::Invalid(
                "identifiers.counter_start must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the configured identifier factory.
    pub fn identifier_factory(&self) -> SettingsResult<Box<dyn IdentifierFactory>> {
        self.validate()?;
        Ok(match self.identifiers.strategy {
            IdentifierStrategy::Counter => Box::new(CounterFactory::starting_at(self.identifiers.counter_start)),
            IdentifierStrategy::Uuid => Box::new(UuidFactory::new()),
        })
    }

    /// New model using the configured identifier factory.
    pub fn create_model(&self) -> SettingsResult<FeatureModel> {
        Ok(FeatureModel::with_factory(self.identifier_factory()?))
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> SettingsResult<String> {
        toml::to_string_pretty(self).map_err(|e| SettingsError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# featmodel configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/featmodel/featmodel.toml
#   File:   path passed explicitly by the embedding application
#   Env:    FEATMODEL__* environment variables, e.g. FEATMODEL__IDENTIFIERS__STRATEGY=uuid

[identifiers]
# "counter" issues 1, 2, 3, ...; "uuid" issues random v4 UUIDs
# strategy = "counter"
# counter_start = 1

[logging]
# tracing EnvFilter directive
# filter = "warn"
"#
        .to_string()
    }
}
