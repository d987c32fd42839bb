//! Offline lookups against a MaxMind GeoLite2-City database
//!
//! Users must download the database file separately from MaxMind (free with
//! registration) and point `geolocation.database` at it.

use maxminddb::{geoip2, Reader};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use super::{GeoError, Locator};
use crate::models::Location;

/// GeoIP lookup service using MaxMind GeoLite2-City database
///
/// # Example
///
/// ```ignore
/// use authlog::geolocation::{GeoIpService, Locator};
///
/// let service = GeoIpService::new("GeoLite2-City.mmdb")?;
/// let location = service.locate("8.8.8.8")?;
/// println!("{}", location.compose());
/// ```
pub struct GeoIpService {
    reader: Arc<Reader<Vec<u8>>>,
}

impl GeoIpService {
    /// Create a new GeoIP service from a MaxMind database file
    ///
    /// # Errors
    ///
    /// Returns an error if the database file cannot be opened or is invalid.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, GeoError> {
        let path = db_path.as_ref();
        if !path.exists() {
            return Err(GeoError::FileNotFound(path.display().to_string()));
        }

        let reader = Reader::open_readfile(path)?;
        Ok(GeoIpService {
            reader: Arc::new(reader),
        })
    }

    /// Look up an already parsed address.
    ///
    /// English names are used; anything missing from the record is left at
    /// its zero value.
    pub fn lookup(&self, ip: &IpAddr) -> Result<Location, GeoError> {
        let city: geoip2::City = self.reader.lookup(*ip).map_err(|e| match e {
            maxminddb::MaxMindDBError::AddressNotFoundError(_) => GeoError::NotFound,
            other => GeoError::Database(other),
        })?;

        let english = |names: Option<std::collections::BTreeMap<&str, &str>>| {
            names
                .and_then(|n| n.get("en").copied())
                .map(String::from)
                .unwrap_or_default()
        };

        let (latitude, longitude) = city
            .location
            .map(|l| (l.latitude.unwrap_or(0.0), l.longitude.unwrap_or(0.0)))
            .unwrap_or((0.0, 0.0));

        Ok(Location {
            country: english(city.country.and_then(|c| c.names)),
            region: english(
                city.subdivisions
                    .and_then(|subs| subs.into_iter().next())
                    .and_then(|s| s.names),
            ),
            city: english(city.city.and_then(|c| c.names)),
            latitude,
            longitude,
        })
    }
}

impl Clone for GeoIpService {
    fn clone(&self) -> Self {
        GeoIpService {
            reader: Arc::clone(&self.reader),
        }
    }
}

impl Locator for GeoIpService {
    fn locate(&self, ip: &str) -> Result<Location, GeoError> {
        let addr: IpAddr = ip
            .parse()
            .map_err(|_| GeoError::InvalidAddress(ip.to_string()))?;
        self.lookup(&addr)
    }
}
