//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod run;
mod storage;

pub use run::{RunConfig, RunMode};
pub use storage::{PostgresConfig, SqliteConfig, StorageConfig, StorageType};

use std::path::PathBuf;

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "STORE_METRICS_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "STORE_METRICS";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "STORE_METRICS_LOG";

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Locations of the staged source files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// ERP orders CSV.
    pub orders: PathBuf,
    /// CRM leads CSV.
    pub leads: PathBuf,
    /// Web events JSON lines.
    pub web: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            orders: PathBuf::from("samples/erp_orders.csv"),
            leads: PathBuf::from("samples/crm_leads.csv"),
            web: PathBuf::from("samples/web_events.json"),
        }
    }
}

/// Curated output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory to export the committed fact table to as CSV.
    /// None = no export.
    pub dir: Option<PathBuf>,
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Run parameters (mode, window).
    pub run: RunConfig,
    /// Staged source files.
    pub sources: SourcesConfig,
    /// Fact table storage.
    pub storage: StorageConfig,
    /// Curated output.
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.run.validate()
    }
}
