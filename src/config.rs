use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::geolocation::ip_api::DEFAULT_ENDPOINT;
use crate::output::OutputFormat;

/// Errors that can occur while loading or saving the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Configuration for the authlog tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Auth log to parse
    pub log_file: PathBuf,
    /// Geolocation backend configuration
    pub geolocation: GeolocationConfig,
    /// Output configuration
    pub output: OutputConfig,
}

/// Which geolocation backend resolves source addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoProvider {
    #[serde(rename = "ip-api")]
    IpApi,
    #[serde(rename = "maxmind")]
    MaxMind,
}

/// Geolocation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// "ip-api" (HTTP lookups) or "maxmind" (local database)
    pub provider: GeoProvider,
    /// Base URL of the ip-api service
    pub endpoint: String,
    /// Path to a GeoLite2-City.mmdb file (maxmind provider only)
    pub database: PathBuf,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// "text" or "json"
    pub format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_file: PathBuf::from("/var/log/auth.log"),
            geolocation: GeolocationConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        GeolocationConfig {
            provider: GeoProvider::IpApi,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            database: PathBuf::from("GeoLite2-City.mmdb"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            format: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
