use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{GeoError, Locator};
use crate::models::Location;

pub const DEFAULT_ENDPOINT: &str = "http://ip-api.com/";

/// Body returned by `GET /json/{ip}`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IpApiResponse {
    status: Option<String>,
    message: Option<String>,
    country: String,
    #[serde(rename = "regionName")]
    region_name: String,
    city: String,
    lat: f64,
    lon: f64,
}

impl IpApiResponse {
    fn into_location(self) -> Result<Location, GeoError> {
        if self.status.as_deref() == Some("fail") {
            return Err(GeoError::Lookup(
                self.message.unwrap_or_else(|| "unknown failure".to_string()),
            ));
        }
        Ok(Location {
            country: self.country,
            region: self.region_name,
            city: self.city,
            latitude: self.lat,
            longitude: self.lon,
        })
    }
}

/// Client for the ip-api.com geolocation service.
///
/// Every call to [`Locator::locate`] issues a fresh blocking request; nothing
/// is cached and failed requests are not retried. The client sets no request
/// timeout of its own, so a stalled endpoint blocks until the OS gives up.
pub struct IpApiClient {
    endpoint: String,
    client: Client,
}

impl IpApiClient {
    pub fn new(endpoint: &str) -> Result<Self, GeoError> {
        let client = Client::builder().timeout(None::<Duration>).build()?;
        Ok(IpApiClient {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url_for(&self, ip: &str) -> String {
        format!("{}/json/{}", self.endpoint, ip)
    }
}

impl Locator for IpApiClient {
    fn locate(&self, ip: &str) -> Result<Location, GeoError> {
        let response = self.client.get(self.url_for(ip)).send()?.error_for_status()?;
        let body = response.text()?;
        let parsed: IpApiResponse = serde_json::from_str(&body)?;
        parsed.into_location()
    }
}
