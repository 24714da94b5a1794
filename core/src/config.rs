//! Layered configuration.
//!
//! Sources, later ones winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file: the path given to the builder, else `$SCRIPTLENS_CONFIG_PATH`,
//!    else `scriptlens.toml` in the working directory when present
//! 3. Environment variables such as `SCRIPTLENS__RENDER__MAX_DEPTH=32`
//! 4. Explicit overrides set on the builder
//!
//! A `.env` file in the working directory is loaded before the environment
//! is read.

use std::env;
use std::path::{Path, PathBuf};

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::actions::ExplainOptions;
use crate::i18n::{Catalog, CatalogError};
use crate::steps::RenderOptions;

pub const CONFIG_PATH_ENV: &str = "SCRIPTLENS_CONFIG_PATH";
pub const ENV_PREFIX: &str = "SCRIPTLENS";
pub const DEFAULT_CONFIG_FILE: &str = "scriptlens.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub render: RenderOptions,
    pub explain: ExplainOptions,
    pub locale: LocaleSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleSettings {
    /// Catalog whose entries replace the built-in English ones
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            explain: ExplainOptions::default(),
            locale: LocaleSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render.summary_max_len < 2 {
            return Err(ConfigError::Invalid(format!(
                "render.summary_max_len must be at least 2, got {}",
                self.render.summary_max_len
            )));
        }
        if self.render.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "render.max_depth must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The English catalog, overridden by `[locale] path` when set
    pub fn catalog(&self) -> Result<Catalog, CatalogError> {
        match &self.locale.path {
            Some(path) => Catalog::english_with_overrides(path),
            None => Ok(Catalog::english()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    important_only: Option<bool>,
}

impl ConfigBuilder {
    /// Read this file instead of the default locations; it must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn important_only(mut self, important_only: Option<bool>) -> Self {
        self.important_only = important_only;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }

        let path = self
            .config_path
            .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?);

        builder = match &path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.clone()));
                }
                debug!(path = %path.display(), "reading configuration file");
                builder.add_source(File::from(path.as_path()).format(FileFormat::Toml))
            }
            None => builder.add_source(
                File::from(Path::new(DEFAULT_CONFIG_FILE))
                    .format(FileFormat::Toml)
                    .required(false),
            ),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(important_only) = self.important_only {
            builder = builder.set_override("render.important_only", important_only)?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
