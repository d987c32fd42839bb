//! IP geolocation lookups
//!
//! Source addresses are resolved to a [`Location`] through the [`Locator`]
//! trait. Two backends are provided: [`IpApiClient`], which queries the
//! ip-api.com JSON endpoint over HTTP, and [`GeoIpService`], which reads a
//! local MaxMind GeoLite2-City database.

pub mod ip_api;
pub mod maxmind;

pub use ip_api::IpApiClient;
pub use maxmind::GeoIpService;

use crate::config::{GeoProvider, GeolocationConfig};
use crate::models::Location;
use thiserror::Error;

/// Errors that can occur during geolocation lookups
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Failed to open database: {0}")]
    Database(#[from] maxminddb::MaxMindDBError),

    #[error("IP address not found in database")]
    NotFound,

    #[error("Database file not found: {0}")]
    FileNotFound(String),

    #[error("Not an IP address: {0}")]
    InvalidAddress(String),
}

/// Resolves a source address, as written in the log, to a location
pub trait Locator {
    fn locate(&self, ip: &str) -> Result<Location, GeoError>;
}

/// Build the locator selected by the configuration
pub fn from_config(config: &GeolocationConfig) -> Result<Box<dyn Locator>, GeoError> {
    match config.provider {
        GeoProvider::IpApi => Ok(Box::new(IpApiClient::new(&config.endpoint)?)),
        GeoProvider::MaxMind => Ok(Box::new(GeoIpService::new(&config.database)?)),
    }
}
