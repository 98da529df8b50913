//! Configuration
//!
//! Settings are layered: built-in defaults, then a TOML file
//! (`fairdice.toml` in the working directory, or an explicit path), then
//! `FAIRDICE_`-prefixed environment variables.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "fairdice.toml";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "FAIRDICE_";

/// Log line encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Encoding of command results written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] figment::Error),
}

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracing filter used when `RUST_LOG` is unset (default: "fairdice=info")
    pub log_filter: String,
    /// Log encoding (default: pretty)
    pub log_format: LogFormat,
    /// Result encoding (default: text)
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "fairdice=info".to_string(),
            log_format: LogFormat::default(),
            output: OutputFormat::default(),
        }
    }
}

impl Config {
    /// Build the layered provider without extracting it
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load configuration. An explicit `path` must exist; the default file
    /// is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
        }

        Ok(Self::figment(path).extract()?)
    }
}
