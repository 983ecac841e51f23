//! Configuration loader and validator for the observation harvester.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::model::DataProvider;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub source: Source,
    pub destination: Destination,
    pub harvest: HarvestOptions,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// Where raw sightings and metadata are read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub database_url: String,
    #[serde(default)]
    pub data_provider: DataProvider,
}

/// Where verbatim observations, vocabularies and harvest info are written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Destination {
    pub database_url: String,
}

/// Chunking and concurrency knobs for a harvest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HarvestOptions {
    /// Width of the sighting id range fetched per chunk.
    pub chunk_size: i32,
    /// Maximum number of concurrent source reads.
    pub no_of_threads: usize,
    /// Optional cap used for test and debug runs.
    #[serde(default)]
    pub max_number_of_sightings_harvested: Option<i32>,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            chunk_size: 100_000,
            no_of_threads: 4,
            max_number_of_sightings_harvested: None,
        }
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Source URL, overridable through `SOURCE_DATABASE_URL`.
    pub fn source_url(&self) -> String {
        std::env::var("SOURCE_DATABASE_URL").unwrap_or_else(|_| self.source.database_url.clone())
    }

    /// Destination URL, overridable through `DATABASE_URL`.
    pub fn destination_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.destination.database_url.clone())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.source.database_url.trim().is_empty() {
        return Err(ConfigError::Invalid("source.database_url must be non-empty"));
    }
    if cfg.destination.database_url.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "destination.database_url must be non-empty",
        ));
    }
    if cfg.harvest.chunk_size <= 0 {
        return Err(ConfigError::Invalid("harvest.chunk_size must be > 0"));
    }
    if cfg.harvest.no_of_threads == 0 {
        return Err(ConfigError::Invalid("harvest.no_of_threads must be > 0"));
    }
    if matches!(cfg.harvest.max_number_of_sightings_harvested, Some(cap) if cap <= 0) {
        return Err(ConfigError::Invalid(
            "harvest.max_number_of_sightings_harvested must be > 0 when set",
        ));
    }
    Ok(())
}

/// Example configuration shipped with the crate.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

source:
  database_url: "sqlite://./data/species_portal.db"
  data_provider: SpeciesPortal

destination:
  database_url: "sqlite://./data/observations.db"

harvest:
  chunk_size: 100000
  no_of_threads: 4
  max_number_of_sightings_harvested: null
"#
}
