//! Configuration loading and typed config structures for the zeroplayer
//! simulation.
//!
//! The configuration lives in `zeroplayer-config.yaml` in the working
//! directory, or wherever `ZEROPLAYER_CONFIG` points. Every field has a
//! default, so a missing file or an empty document yields a runnable
//! simulation over the built-in animals catalog.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use zeroplayer_world::{CatalogConfig, StartingWorld};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "zeroplayer-config.yaml";

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV_VAR: &str = "ZEROPLAYER_CONFIG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Seed, run length, starting world, and save files.
    #[serde(default)]
    pub world: WorldConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Kind profiles. Omitted means the built-in animals table.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Load from `path`, falling back to defaults if the file does not
    /// exist. Any other failure is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::from_file(path) {
            Err(ConfigError::Io { source }) if source.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// The configuration path: `ZEROPLAYER_CONFIG` if set, otherwise
    /// [`DEFAULT_CONFIG_FILE`].
    pub fn resolve_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Stop after this many ticks. Zero runs until extinction.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Locations and population of a fresh world.
    #[serde(default)]
    pub starting: StartingWorld,

    /// Render the world every N ticks. Zero disables rendering.
    #[serde(default)]
    pub render_every: u64,

    /// Write a JSON snapshot here when the run ends.
    #[serde(default)]
    pub save_path: Option<PathBuf>,

    /// Resume from this JSON snapshot instead of building a fresh world.
    #[serde(default)]
    pub resume_path: Option<PathBuf>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            max_ticks: default_max_ticks(),
            starting: StartingWorld::default(),
            render_every: 0,
            save_path: None,
            resume_path: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

const fn default_seed() -> u64 {
    42
}

const fn default_max_ticks() -> u64 {
    200
}

fn default_log_level() -> String {
    String::from("info")
}
